//! Command-line argument dispatch and server initialization.
//!
//! Maps validated CLI arguments to the action to execute, currently only
//! starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    // Cross-argument checks (distinct signing secrets) live in commands.
    crate::cli::commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        access_token_secret: auth_opts.access_token_secret,
        refresh_token_secret: auth_opts.refresh_token_secret,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        refresh_token_ttl_seconds: auth_opts.refresh_token_ttl_seconds,
        landing_path: auth_opts.landing_path,
    }))
}
