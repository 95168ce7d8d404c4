use chaos_proxy_lib::stats::{format_bytes, format_uptime};
use chaos_proxy_lib::StatsCollector;

#[tokio::test]
async fn connection_lifecycle_is_counted_once() {
    let stats = StatsCollector::new();

    stats.connection_started("c1", "HTTP", "127.0.0.1:5000").await;
    stats.connection_started("c2", "SOCKS5", "127.0.0.1:5001").await;

    let snapshot = stats.snapshot().await;
    assert_eq!(snapshot.connections.active, 2);
    assert_eq!(snapshot.connections.total, 2);
    assert_eq!(snapshot.protocols.get("HTTP"), Some(&1));
    assert_eq!(snapshot.protocols.get("SOCKS5"), Some(&1));

    stats.connection_ended("c1", true).await;
    stats.connection_ended("c2", false).await;

    let snapshot = stats.snapshot().await;
    assert_eq!(snapshot.connections.active, 0);
    assert_eq!(snapshot.connections.success, 1);
    assert_eq!(snapshot.connections.failed, 1);

    // ending an unknown connection changes nothing
    stats.connection_ended("ghost", true).await;
    let snapshot = stats.snapshot().await;
    assert_eq!(snapshot.connections.success, 1);
    assert_eq!(snapshot.connections.failed, 1);
}

#[tokio::test]
async fn traffic_totals_are_monotonic() {
    let stats = StatsCollector::new();
    stats.connection_started("c1", "HTTP", "peer").await;

    stats.record_traffic("c1", 100, 50).await;
    stats.record_traffic("c1", 10, 5).await;
    // traffic for finished or unknown connections still lands in totals
    stats.record_traffic("gone", 1, 1).await;

    let snapshot = stats.snapshot().await;
    assert_eq!(snapshot.traffic.sent, 111);
    assert_eq!(snapshot.traffic.received, 56);
    assert_eq!(snapshot.traffic.total, 167);
}

#[tokio::test]
async fn routing_decisions_are_tallied() {
    let stats = StatsCollector::new();
    stats.connection_started("c1", "HTTP", "peer").await;

    stats.record_bypass("c1", "domain_bypass").await;
    stats.record_tunnel("c2").await;
    stats.record_tunnel("c3").await;

    let snapshot = stats.snapshot().await;
    assert_eq!(snapshot.routing.bypassed, 1);
    assert_eq!(snapshot.routing.tunneled, 2);
}

#[tokio::test]
async fn snapshot_serializes_to_json() {
    let stats = StatsCollector::new();
    stats.connection_started("c1", "HTTP", "peer").await;
    stats.record_traffic("c1", 2048, 0).await;

    let snapshot = stats.snapshot().await;
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["traffic"]["sent"], 2048);
    assert_eq!(json["traffic"]["sent_formatted"], "2.00 KB");
    assert_eq!(json["connections"]["active"], 1);
}

#[test]
fn byte_formatting_scales_units() {
    assert_eq!(format_bytes(0), "0.00 B");
    assert_eq!(format_bytes(1023), "1023.00 B");
    assert_eq!(format_bytes(1024), "1.00 KB");
    assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
    assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
}

#[test]
fn uptime_formatting_drops_empty_leading_units() {
    assert_eq!(format_uptime(5.0), "5s");
    assert_eq!(format_uptime(65.0), "1m 5s");
    assert_eq!(format_uptime(3_600.0), "1h 0s");
    assert_eq!(format_uptime(90_061.0), "1d 1h 1m 1s");
}
