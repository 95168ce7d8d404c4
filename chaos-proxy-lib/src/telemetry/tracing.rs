use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global subscriber from the logging section.
/// `RUST_LOG`, when set, wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.show_target)
        .init();
}
