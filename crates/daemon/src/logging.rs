//! Log subscriber setup.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// The driver logs every pool and server-selection event at debug level.
const DRIVER_DIRECTIVE: &str = "mongodb=warn";

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--log` applies, with the MongoDB driver kept
/// at `warn` unless the level names it explicitly.
pub fn init(log_level: &str) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for(log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("install log subscriber")
}

fn filter_for(log_level: &str) -> anyhow::Result<EnvFilter> {
    let directives = if log_level.contains("mongodb") {
        log_level.to_string()
    } else {
        format!("{log_level},{DRIVER_DIRECTIVE}")
    };
    EnvFilter::try_new(&directives).with_context(|| format!("invalid --log value {log_level:?}"))
}
