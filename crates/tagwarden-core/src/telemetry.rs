//! Log output for the `tagwarden` command.
//!
//! Policy runs print their JSON report on stdout, so every log line is
//! written to stderr. Verbosity comes from `TAGWARDEN_LOG`, then
//! `RUST_LOG`, then the level picked on the command line.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives read before `RUST_LOG`.
pub const LOG_ENV: &str = "TAGWARDEN_LOG";

/// Resolve the filter for this process.
fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the process-wide subscriber; `json` selects one JSON object per
/// line. A second call keeps the first subscriber.
pub fn init_tracing(json: bool, level: Level) {
    let registry = tracing_subscriber::registry().with(log_filter(level));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
