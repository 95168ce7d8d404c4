mod bypass;
mod dns;
mod evasion;
mod limits;
mod loader;
mod root;
mod server;
mod telemetry;

pub use bypass::{BypassConfig, BypassRules};
pub use dns::{DnsConfig, DnsMode, DnsServers, DohServer, DotServer};
pub use evasion::{CdnDomains, ChaosConfig, EvasionConfig};
pub use limits::{BufferConfig, LimitsConfig};
pub use loader::{load_from_path, load_json_or_default, sibling_path};
pub use root::Config;
pub use server::ServerConfig;
pub use telemetry::{LoggingConfig, WebConfig};
