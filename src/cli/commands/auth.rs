//! Auth-related CLI arguments: frontend origin, token secrets, and TTLs.

use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";
pub const ARG_LANDING_PATH: &str = "landing-path";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend base URL; drives CORS and cookie security")
                .default_value("http://localhost:3000")
                .env("MENTORIUM_FRONTEND_URL"),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("HMAC secret signing access tokens")
                .env("MENTORIUM_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("HMAC secret signing refresh tokens; must differ from the access secret")
                .env("MENTORIUM_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token lifetime in seconds")
                .default_value("900")
                .env("MENTORIUM_ACCESS_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token lifetime in seconds")
                .default_value("604800")
                .env("MENTORIUM_REFRESH_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_LANDING_PATH)
                .long(ARG_LANDING_PATH)
                .help("Default post-login destination")
                .default_value("/dashboard")
                .env("MENTORIUM_LANDING_PATH"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub landing_path: String,
}

impl Options {
    /// Extract the auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error when a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_URL)
            .cloned()
            .context("missing required argument: --frontend-url")?;
        let access_token_secret = matches
            .get_one::<String>(ARG_ACCESS_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --access-token-secret")?;
        let refresh_token_secret = matches
            .get_one::<String>(ARG_REFRESH_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --refresh-token-secret")?;
        let access_token_ttl_seconds = matches
            .get_one::<i64>(ARG_ACCESS_TOKEN_TTL)
            .copied()
            .unwrap_or(900);
        let refresh_token_ttl_seconds = matches
            .get_one::<i64>(ARG_REFRESH_TOKEN_TTL)
            .copied()
            .unwrap_or(604_800);
        let landing_path = matches
            .get_one::<String>(ARG_LANDING_PATH)
            .cloned()
            .unwrap_or_else(|| "/dashboard".to_string());

        Ok(Self {
            frontend_base_url,
            access_token_secret: SecretString::from(access_token_secret),
            refresh_token_secret: SecretString::from(refresh_token_secret),
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            landing_path,
        })
    }
}
