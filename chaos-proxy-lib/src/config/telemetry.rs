use serde::Deserialize;

/// Stats endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    /// Serve the JSON stats snapshot over HTTP
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Stats endpoint port
    /// Default: 8080
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), port: default_web_port() }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_web_port() -> u16 {
    8080
}

/// Logging configuration
/// Controls application-level structured logging (stdout/stderr)
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Default: "info"
    /// Can be overridden at runtime via RUST_LOG environment variable
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
