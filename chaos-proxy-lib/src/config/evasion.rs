use std::collections::HashMap;

use serde::Deserialize;

/// Fragmentation aggressiveness
#[derive(Debug, Deserialize, Clone)]
pub struct ChaosConfig {
    /// Aggressive mode splits the ClientHello into 3..=7 fragments,
    /// conservative mode into 2..=4
    /// Default: true
    #[serde(default = "default_true")]
    pub aggressive: bool,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self { aggressive: default_true() }
    }
}

/// Domain fronting and optional record randomization
#[derive(Debug, Deserialize, Clone)]
pub struct EvasionConfig {
    /// Replace the upstream hostname with a CDN co-tenant for port-443
    /// CONNECT targets
    /// Default: true
    #[serde(default = "default_true")]
    pub domain_fronting: bool,
    /// CDN host list file, resolved relative to the main config file
    /// Default: "cdn_domains.json"
    #[serde(default = "default_cdn_file")]
    pub cdn_domains_file: String,
    /// Chunk every outbound write, not just the first ClientHello
    /// Default: false
    #[serde(default)]
    pub record_randomization: bool,
}

impl Default for EvasionConfig {
    fn default() -> Self {
        Self {
            domain_fronting: default_true(),
            cdn_domains_file: default_cdn_file(),
            record_randomization: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cdn_file() -> String {
    "cdn_domains.json".to_string()
}

/// Contents of `cdn_domains.json`: provider name to frontable hostnames
#[derive(Debug, Deserialize, Clone)]
pub struct CdnDomains {
    #[serde(default)]
    pub cdn_domains: HashMap<String, Vec<String>>,
}

impl Default for CdnDomains {
    fn default() -> Self {
        let mut cdn_domains = HashMap::new();
        cdn_domains.insert("cloudflare".to_string(), vec!["www.cloudflare.com".to_string()]);
        cdn_domains.insert("akamai".to_string(), vec!["www.akamai.com".to_string()]);
        cdn_domains.insert("google".to_string(), vec!["www.google.com".to_string()]);
        Self { cdn_domains }
    }
}
