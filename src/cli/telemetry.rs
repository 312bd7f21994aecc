//! Logging setup: `tracing` with an env filter and either a pretty or a
//! JSON fmt layer. Format is selected with `MENTORIUM_LOG_FORMAT=json`.

use anyhow::Result;
use std::env::var;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

fn build_filter(verbosity_level: Level) -> Result<EnvFilter> {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?);
    Ok(filter)
}

/// Initialize the global tracing subscriber.
///
/// # Errors
/// Returns an error if filter directives fail to parse or a subscriber is
/// already installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);
    let filter = build_filter(verbosity_level)?;

    if var("MENTORIUM_LOG_FORMAT").is_ok_and(|format| format == "json") {
        let fmt_layer = fmt::layer().with_target(false).json();
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let fmt_layer = fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_target(false)
            .pretty();
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
