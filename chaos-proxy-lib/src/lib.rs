#![forbid(unsafe_code)]

pub mod bypass;
pub mod chaos;
pub mod config;
pub mod dns;
pub mod error;
pub mod fronting;
pub mod proxy;
pub mod stats;
pub mod telemetry;
pub mod tls;

pub use bypass::BypassList;
pub use chaos::ChaosEngine;
pub use config::{load_from_path, Config};
pub use dns::DnsResolver;
pub use error::{ProxyError, Result};
pub use fronting::DomainFronter;
pub use proxy::limiter::ConnectionLimiter;
pub use stats::StatsCollector;
pub use tls::Fragmenter;
