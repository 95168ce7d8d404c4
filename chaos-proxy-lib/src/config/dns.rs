use serde::Deserialize;

/// Which encrypted transport the resolver uses
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DnsMode {
    #[default]
    Doh,
    Dot,
}

/// Encrypted DNS resolver settings
#[derive(Debug, Deserialize, Clone)]
pub struct DnsConfig {
    /// Server list file, resolved relative to the main config file
    /// Default: "dns_servers.json"
    #[serde(default = "default_servers_file")]
    pub servers_file: String,
    /// Transport: "doh" or "dot"
    /// Default: doh
    #[serde(default)]
    pub mode: DnsMode,
    /// Cache entry lifetime in seconds
    /// Default: 300
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    /// Maximum number of cached entries
    /// Default: 1000
    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers_file: default_servers_file(),
            mode: DnsMode::default(),
            cache_ttl: default_cache_ttl(),
            cache_max_size: default_cache_max_size(),
        }
    }
}

fn default_servers_file() -> String {
    "dns_servers.json".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_size() -> usize {
    1000
}

/// One DNS-over-HTTPS upstream. `ip` is the dial target so resolving the
/// server name never recurses through the resolver itself; `url` supplies
/// the SNI, Host header and query path.
#[derive(Debug, Deserialize, Clone)]
pub struct DohServer {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub ip: Option<String>,
}

/// One DNS-over-TLS upstream. `hostname`, when set, is the SNI and
/// certificate verification name.
#[derive(Debug, Deserialize, Clone)]
pub struct DotServer {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Contents of `dns_servers.json`
#[derive(Debug, Deserialize, Clone)]
pub struct DnsServers {
    #[serde(default)]
    pub doh_servers: Vec<DohServer>,
    #[serde(default)]
    pub dot_servers: Vec<DotServer>,
}

impl Default for DnsServers {
    fn default() -> Self {
        Self {
            doh_servers: vec![
                DohServer {
                    name: "Cloudflare".to_string(),
                    url: "https://1.1.1.1/dns-query".to_string(),
                    ip: Some("1.1.1.1".to_string()),
                },
                DohServer {
                    name: "Google".to_string(),
                    url: "https://8.8.8.8/dns-query".to_string(),
                    ip: Some("8.8.8.8".to_string()),
                },
            ],
            dot_servers: vec![
                DotServer {
                    name: "Cloudflare".to_string(),
                    host: "1.1.1.1".to_string(),
                    port: 853,
                    hostname: Some("one.one.one.one".to_string()),
                },
                DotServer {
                    name: "Google".to_string(),
                    host: "8.8.8.8".to_string(),
                    port: 853,
                    hostname: Some("dns.google".to_string()),
                },
            ],
        }
    }
}
