use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Bounds concurrent connections with a counting semaphore. Acquisition
/// is timed; a connection that cannot get a slot in time is counted as
/// rejected and closed by the caller.
pub struct ConnectionLimiter {
    semaphore: Arc<Semaphore>,
    max_connections: usize,
    current: Arc<AtomicUsize>,
    rejected_total: AtomicU64,
}

/// Slot held for the lifetime of one connection; dropping it returns the
/// permit and decrements the active count.
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
    current: Arc<AtomicUsize>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LimiterStats {
    pub max_connections: usize,
    pub current_connections: usize,
    pub available_slots: usize,
    pub rejected_total: u64,
    pub utilization_percent: f64,
}

impl ConnectionLimiter {
    pub fn new(max_connections: usize) -> Self {
        info!(max_connections, "connection limit set");
        Self {
            semaphore: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            current: Arc::new(AtomicUsize::new(0)),
            rejected_total: AtomicU64::new(0),
        }
    }

    pub async fn acquire(&self, wait: Duration) -> Option<ConnectionPermit> {
        match timeout(wait, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => {
                let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(current, max = self.max_connections, "connection slot acquired");
                Some(ConnectionPermit { _permit: permit, current: self.current.clone() })
            }
            _ => {
                self.rejected_total.fetch_add(1, Ordering::Relaxed);
                warn!(
                    current = self.current.load(Ordering::Relaxed),
                    max = self.max_connections,
                    "connection rejected (acquire timeout)"
                );
                None
            }
        }
    }

    pub fn current_connections(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_total.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> LimiterStats {
        let current = self.current_connections();
        LimiterStats {
            max_connections: self.max_connections,
            current_connections: current,
            available_slots: self.max_connections.saturating_sub(current),
            rejected_total: self.rejected_total(),
            utilization_percent: current as f64 / self.max_connections as f64 * 100.0,
        }
    }
}
