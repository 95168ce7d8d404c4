use serde::Deserialize;

/// Bypass rule file location
#[derive(Debug, Deserialize, Clone)]
pub struct BypassConfig {
    /// Rule file, resolved relative to the main config file
    /// Default: "iranian_domains.json"
    #[serde(default = "default_domains_file")]
    pub domains_file: String,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self { domains_file: default_domains_file() }
    }
}

fn default_domains_file() -> String {
    "iranian_domains.json".to_string()
}

/// Contents of the bypass rule file: domain rules (exact or ".suffix"),
/// CIDR ranges, and download MIME types
#[derive(Debug, Deserialize, Clone)]
pub struct BypassRules {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub ip_ranges: Vec<String>,
    #[serde(default)]
    pub download_mime_types: Vec<String>,
}

impl Default for BypassRules {
    fn default() -> Self {
        Self {
            domains: vec![
                ".ir".to_string(),
                "aparat.com".to_string(),
                "digikala.com".to_string(),
            ],
            ip_ranges: Vec::new(),
            download_mime_types: vec![
                "application/octet-stream".to_string(),
                "application/zip".to_string(),
                "video/mp4".to_string(),
                "audio/mpeg".to_string(),
            ],
        }
    }
}
