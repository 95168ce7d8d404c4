use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::net::lookup_host;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use crate::config::{DnsConfig, DnsMode, DnsServers};
use crate::dns::cache::{CacheStats, DnsCache};
use crate::dns::transport;

/// Encrypted DNS resolver: DoH or DoT upstreams tried in order, a bounded
/// TTL cache in front, the OS resolver as the last resort.
pub struct DnsResolver {
    mode: DnsMode,
    servers: DnsServers,
    cache: DnsCache,
    connector: TlsConnector,
}

impl DnsResolver {
    pub fn new(servers: DnsServers, config: &DnsConfig) -> Self {
        info!(
            doh = servers.doh_servers.len(),
            dot = servers.dot_servers.len(),
            mode = ?config.mode,
            "DNS resolver ready"
        );
        Self {
            mode: config.mode,
            servers,
            cache: DnsCache::new(Duration::from_secs(config.cache_ttl), config.cache_max_size),
            connector: transport::tls_connector(),
        }
    }

    /// Resolve a hostname to an IPv4 address, or `None` when every avenue
    /// is exhausted. Callers translate `None` into their protocol's
    /// failure reply.
    pub async fn resolve(&self, hostname: &str) -> Option<Ipv4Addr> {
        let hostname = hostname.to_ascii_lowercase();

        if let Ok(ip) = hostname.parse::<Ipv4Addr>() {
            return Some(ip);
        }

        if let Some(ip) = self.cache.get(&hostname) {
            debug!(host = %hostname, %ip, "cache hit");
            return Some(ip);
        }

        if let Some(ip) = self.query_upstreams(&hostname).await {
            self.cache.insert(&hostname, ip);
            info!(host = %hostname, %ip, mode = ?self.mode, "resolved");
            return Some(ip);
        }

        warn!(host = %hostname, "encrypted DNS failed, trying system resolver");
        let ip = self.system_resolve(&hostname).await?;
        self.cache.insert(&hostname, ip);
        Some(ip)
    }

    async fn query_upstreams(&self, hostname: &str) -> Option<Ipv4Addr> {
        match self.mode {
            DnsMode::Doh => {
                for server in &self.servers.doh_servers {
                    match transport::query_doh(&self.connector, server, hostname).await {
                        Ok(ip) => return Some(ip),
                        Err(e) => {
                            debug!(server = %server.name, error = %e, "DoH query failed");
                        }
                    }
                }
            }
            DnsMode::Dot => {
                for server in &self.servers.dot_servers {
                    match transport::query_dot(&self.connector, server, hostname).await {
                        Ok(ip) => return Some(ip),
                        Err(e) => {
                            debug!(server = %server.name, error = %e, "DoT query failed");
                        }
                    }
                }
            }
        }
        None
    }

    async fn system_resolve(&self, hostname: &str) -> Option<Ipv4Addr> {
        match lookup_host((hostname, 0u16)).await {
            Ok(addrs) => addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(ip) => Some(ip),
                    IpAddr::V6(_) => None,
                })
                .next(),
            Err(e) => {
                warn!(host = %hostname, error = %e, "system DNS failed");
                None
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
