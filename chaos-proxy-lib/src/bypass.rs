use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;
use tracing::{info, warn};

use crate::config::BypassRules;

/// Decides whether a destination should skip evasion. Domain rules are
/// exact names or `.suffix` entries; IP rules are loopback, RFC1918, and
/// configured CIDRs. Read-only after construction, safe to share.
#[derive(Debug)]
pub struct BypassList {
    domains: HashSet<String>,
    networks: Vec<IpNet>,
    mime_types: HashSet<String>,
}

impl BypassList {
    pub fn from_rules(rules: BypassRules) -> Self {
        let mut networks = Vec::with_capacity(rules.ip_ranges.len());
        for range in &rules.ip_ranges {
            match range.parse::<IpNet>() {
                Ok(net) => networks.push(net),
                Err(e) => warn!(%range, error = %e, "invalid bypass IP range"),
            }
        }

        let list = Self {
            domains: rules.domains.into_iter().collect(),
            networks,
            mime_types: rules.download_mime_types.into_iter().collect(),
        };
        info!(
            domains = list.domains.len(),
            ip_ranges = list.networks.len(),
            "bypass rules loaded"
        );
        list
    }

    pub fn should_bypass_domain(&self, hostname: &str) -> bool {
        if hostname.is_empty() {
            return false;
        }

        let hostname = hostname.to_ascii_lowercase();

        if matches!(hostname.as_str(), "localhost" | "127.0.0.1" | "0.0.0.0" | "::1") {
            return true;
        }

        if self.domains.contains(&hostname) {
            return true;
        }

        self.domains.iter().any(|domain| {
            if domain.starts_with('.') {
                hostname.ends_with(domain.as_str())
            } else {
                hostname.ends_with(&format!(".{domain}"))
            }
        })
    }

    pub fn should_bypass_ip(&self, ip: IpAddr) -> bool {
        let local = match ip {
            IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
            IpAddr::V6(v6) => v6.is_loopback(),
        };
        local || self.networks.iter().any(|net| net.contains(&ip))
    }

    /// Unused by the relay core; carried for dashboard/API callers.
    pub fn should_bypass_mime(&self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        !mime.is_empty() && self.mime_types.contains(&mime)
    }
}
