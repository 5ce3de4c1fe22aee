use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over `filter`.
/// Returns false when a subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    fmt().with_env_filter(env_filter).with_target(true).try_init().is_ok()
}
