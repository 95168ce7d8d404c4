use serde::Deserialize;

/// Connection limits
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Maximum concurrent client connections
    /// Default: 100
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_connections: default_max_connections() }
    }
}

fn default_max_connections() -> usize {
    100
}

/// Read buffer sizes in bytes
#[derive(Debug, Deserialize, Clone)]
pub struct BufferConfig {
    /// First-bytes read used for protocol detection
    /// Default: 8192
    #[serde(default = "default_small")]
    pub small: usize,
    /// Per-direction relay read
    /// Default: 65536
    #[serde(default = "default_medium")]
    pub medium: usize,
    /// Generic relay read
    /// Default: 262144
    #[serde(default = "default_large")]
    pub large: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { small: default_small(), medium: default_medium(), large: default_large() }
    }
}

fn default_small() -> usize {
    8192
}

fn default_medium() -> usize {
    65536
}

fn default_large() -> usize {
    262144
}
