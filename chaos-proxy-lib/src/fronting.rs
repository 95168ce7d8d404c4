use rand::prelude::IndexedRandom;
use tracing::{debug, info};

use crate::config::CdnDomains;

/// Picks a CDN co-tenant hostname to use as the upstream SNI in place of
/// the real destination.
#[derive(Debug)]
pub struct DomainFronter {
    enabled: bool,
    cdn_domains: CdnDomains,
}

impl DomainFronter {
    pub fn new(cdn_domains: CdnDomains, enabled: bool) -> Self {
        if enabled {
            let total: usize = cdn_domains.cdn_domains.values().map(Vec::len).sum();
            info!(cdns = cdn_domains.cdn_domains.len(), domains = total, "domain fronting ready");
        } else {
            info!("domain fronting disabled");
        }
        Self { enabled, cdn_domains }
    }

    /// A frontable hostname chosen uniformly at random, from the named
    /// provider when given, otherwise from a random provider. `None` when
    /// disabled or nothing is configured.
    pub fn select_front_domain(
        &self,
        cdn_provider: Option<&str>,
        real_domain: Option<&str>,
    ) -> Option<String> {
        if !self.enabled || self.cdn_domains.cdn_domains.is_empty() {
            return None;
        }

        let mut rng = rand::rng();

        let provider = match cdn_provider {
            Some(p) if self.cdn_domains.cdn_domains.contains_key(p) => p.to_string(),
            _ => {
                let providers: Vec<&String> = self.cdn_domains.cdn_domains.keys().collect();
                (*providers.choose(&mut rng)?).clone()
            }
        };

        let domains = self.cdn_domains.cdn_domains.get(&provider)?;
        let front = domains.choose(&mut rng)?.clone();

        if let Some(real) = real_domain {
            debug!(%real, %front, %provider, "fronting domain selected");
        }

        Some(front)
    }

    pub fn available_cdns(&self) -> Vec<String> {
        self.cdn_domains.cdn_domains.keys().cloned().collect()
    }
}
