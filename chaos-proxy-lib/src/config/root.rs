use serde::Deserialize;

use super::bypass::BypassConfig;
use super::dns::DnsConfig;
use super::evasion::{ChaosConfig, EvasionConfig};
use super::limits::{BufferConfig, LimitsConfig};
use super::server::ServerConfig;
use super::telemetry::{LoggingConfig, WebConfig};

/// Main configuration structure, parsed from `config.yaml`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Listener address and port
    #[serde(default)]
    pub server: ServerConfig,
    /// Encrypted DNS resolver settings
    #[serde(default)]
    pub dns: DnsConfig,
    /// Fragmentation aggressiveness
    #[serde(default)]
    pub chaos: ChaosConfig,
    /// Domain fronting and optional record randomization
    #[serde(default)]
    pub evasion: EvasionConfig,
    /// Bypass rule file location
    #[serde(default)]
    pub bypass: BypassConfig,
    /// Connection limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Read buffer sizes
    #[serde(default)]
    pub buffers: BufferConfig,
    /// Stats endpoint
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
