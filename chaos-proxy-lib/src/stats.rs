use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chaos::ChaosMetrics;

/// Live record for one accepted connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionRecord {
    pub started_at: f64,
    pub protocol: String,
    pub remote_host: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub is_bypassed: bool,
    pub bypass_reason: String,
}

#[derive(Debug, Default)]
struct StatsInner {
    connections_active: u64,
    connections_total: u64,
    connections_success: u64,
    connections_failed: u64,

    bytes_sent_total: u64,
    bytes_received_total: u64,

    bypassed_total: u64,
    tunneled_total: u64,

    protocol_counts: HashMap<String, u64>,
    active_connections: HashMap<String, ConnectionRecord>,

    last_chaos: Option<ChaosMetrics>,
}

/// Snapshot handed to the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: f64,
    pub uptime_formatted: String,
    pub connections: ConnectionCounters,
    pub traffic: TrafficCounters,
    pub routing: RoutingCounters,
    pub protocols: HashMap<String, u64>,
    pub active_connections: HashMap<String, ConnectionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chaos: Option<ChaosMetrics>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConnectionCounters {
    pub active: u64,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficCounters {
    pub sent: u64,
    pub sent_formatted: String,
    pub received: u64,
    pub received_formatted: String,
    pub total: u64,
    pub total_formatted: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoutingCounters {
    pub bypassed: u64,
    pub tunneled: u64,
}

/// Process-wide connection and traffic accounting. Every mutation goes
/// through the single mutex; connection tasks touch it only at well
/// separated points (start, routing decision, end).
pub struct StatsCollector {
    started: Instant,
    inner: Mutex<StatsInner>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self { started: Instant::now(), inner: Mutex::new(StatsInner::default()) }
    }

    pub async fn connection_started(&self, conn_id: &str, protocol: &str, remote_host: &str) {
        let mut inner = self.inner.lock().await;
        inner.connections_active += 1;
        inner.connections_total += 1;
        *inner.protocol_counts.entry(protocol.to_string()).or_insert(0) += 1;

        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        inner.active_connections.insert(
            conn_id.to_string(),
            ConnectionRecord {
                started_at,
                protocol: protocol.to_string(),
                remote_host: remote_host.to_string(),
                bytes_sent: 0,
                bytes_received: 0,
                is_bypassed: false,
                bypass_reason: String::new(),
            },
        );
        debug!(conn = conn_id, protocol, remote = remote_host, "connection started");
    }

    pub async fn connection_ended(&self, conn_id: &str, success: bool) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.active_connections.remove(conn_id) {
            inner.connections_active = inner.connections_active.saturating_sub(1);
            if success {
                inner.connections_success += 1;
            } else {
                inner.connections_failed += 1;
            }
            debug!(
                conn = conn_id,
                protocol = %record.protocol,
                sent = %format_bytes(record.bytes_sent),
                received = %format_bytes(record.bytes_received),
                "connection closed"
            );
        }
    }

    pub async fn record_traffic(&self, conn_id: &str, bytes_sent: u64, bytes_received: u64) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.active_connections.get_mut(conn_id) {
            record.bytes_sent += bytes_sent;
            record.bytes_received += bytes_received;
        }
        inner.bytes_sent_total += bytes_sent;
        inner.bytes_received_total += bytes_received;
    }

    pub async fn record_bypass(&self, conn_id: &str, reason: &str) {
        let mut inner = self.inner.lock().await;
        inner.bypassed_total += 1;
        if let Some(record) = inner.active_connections.get_mut(conn_id) {
            record.is_bypassed = true;
            record.bypass_reason = reason.to_string();
        }
    }

    pub async fn record_tunnel(&self, _conn_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.tunneled_total += 1;
    }

    /// Keep the most recent connection's chaos summary for the dashboard.
    pub async fn record_chaos_metrics(&self, metrics: ChaosMetrics) {
        let mut inner = self.inner.lock().await;
        inner.last_chaos = Some(metrics);
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().await;
        let uptime = self.started.elapsed().as_secs_f64();
        let total = inner.bytes_sent_total + inner.bytes_received_total;
        StatsSnapshot {
            uptime_seconds: uptime,
            uptime_formatted: format_uptime(uptime),
            connections: ConnectionCounters {
                active: inner.connections_active,
                total: inner.connections_total,
                success: inner.connections_success,
                failed: inner.connections_failed,
            },
            traffic: TrafficCounters {
                sent: inner.bytes_sent_total,
                sent_formatted: format_bytes(inner.bytes_sent_total),
                received: inner.bytes_received_total,
                received_formatted: format_bytes(inner.bytes_received_total),
                total,
                total_formatted: format_bytes(total),
            },
            routing: RoutingCounters {
                bypassed: inner.bypassed_total,
                tunneled: inner.tunneled_total,
            },
            protocols: inner.protocol_counts.clone(),
            active_connections: inner.active_connections.clone(),
            chaos: inner.last_chaos,
        }
    }

    /// Logged once at shutdown.
    pub async fn log_summary(&self) {
        let snapshot = self.snapshot().await;
        info!(
            uptime = %snapshot.uptime_formatted,
            active = snapshot.connections.active,
            total = snapshot.connections.total,
            success = snapshot.connections.success,
            failed = snapshot.connections.failed,
            sent = %snapshot.traffic.sent_formatted,
            received = %snapshot.traffic.received_formatted,
            bypassed = snapshot.routing.bypassed,
            tunneled = snapshot.routing.tunneled,
            "final statistics"
        );
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

pub fn format_uptime(seconds: f64) -> String {
    let total = seconds as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));
    parts.join(" ")
}
