use serde::Deserialize;

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to bind
    /// Default: "0.0.0.0"
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind
    /// Default: 10809
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10809
}
