//! Tracing initialization and subscriber setup.

use crate::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Installs a global `tracing` subscriber writing formatted events to stderr.
///
/// # Trace Level Resolution
///
/// The filter is taken from:
/// 1. `RUST_LOG` if it is set and valid
/// 2. `config.trace_level` if set
/// 3. Default: `"info"`
///
/// An invalid `trace_level` falls back to the default.
///
/// # Initialization Behavior
///
/// Idempotent: only the first call in a process takes effect, and an existing
/// global subscriber installed by the host is left alone.
///
/// # Example
///
/// ```rust
/// use synapse::observability::init_tracing;
/// use synapse::Config;
///
/// let config = Config {
///     trace_level: Some("synapse=debug".to_string()),
///     ..Default::default()
/// };
///
/// init_tracing(&config);
///
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(config));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true));

    let _ = subscriber.try_init();
}

fn configured_filter(config: &Config) -> EnvFilter {
    let level = config.trace_level.as_deref().unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}
