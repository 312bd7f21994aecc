use crate::{api, api::handlers::auth::AuthConfig, tokens::TokenConfig};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub landing_path: String,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the database is unreachable or the server fails to
/// start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config =
        AuthConfig::new(args.frontend_base_url).with_landing_path(args.landing_path);

    let token_config = TokenConfig::new(args.access_token_secret, args.refresh_token_secret)
        .with_access_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_token_ttl_seconds);

    api::new(args.port, args.dsn, auth_config, &token_config).await
}
