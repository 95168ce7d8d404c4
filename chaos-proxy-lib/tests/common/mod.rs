#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chaos_proxy_lib::config::{
    BufferConfig, BypassRules, CdnDomains, ChaosConfig, DnsConfig, DnsServers, EvasionConfig,
};
use chaos_proxy_lib::proxy::ProxyContext;
use chaos_proxy_lib::{
    BypassList, ConnectionLimiter, DnsResolver, DomainFronter, StatsCollector,
};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub fn pick_free_port() -> TestResult<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// A context with no DNS upstreams (IP-literal targets short-circuit) and
/// fronting disabled, so tests stay on the local machine.
pub fn test_context(max_connections: usize) -> Arc<ProxyContext> {
    let servers = DnsServers { doh_servers: Vec::new(), dot_servers: Vec::new() };
    Arc::new(ProxyContext {
        dns: DnsResolver::new(servers, &DnsConfig::default()),
        bypass: BypassList::from_rules(BypassRules::default()),
        fronter: DomainFronter::new(CdnDomains::default(), false),
        stats: StatsCollector::new(),
        limiter: ConnectionLimiter::new(max_connections),
        buffers: BufferConfig::default(),
        chaos: ChaosConfig::default(),
        evasion: EvasionConfig {
            domain_fronting: false,
            ..EvasionConfig::default()
        },
    })
}

/// Spawn the proxy on a fresh port. The returned sender keeps the
/// shutdown channel open for the test's lifetime.
pub async fn spawn_proxy(
    ctx: Arc<ProxyContext>,
) -> TestResult<(SocketAddr, watch::Sender<bool>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, mut rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = chaos_proxy_lib::proxy::run(ctx, listener, &mut rx).await;
    });
    // Give the accept loop a moment to start.
    sleep(Duration::from_millis(20)).await;
    Ok((addr, tx))
}

/// Backend that records everything a single connection sends, delivering
/// the bytes once the peer closes.
pub async fn spawn_recording_server(
) -> TestResult<(SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                continue;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if stream.read_to_end(&mut buf).await.is_ok() {
                    let _ = tx.send(buf);
                }
            });
        }
    });
    Ok((addr, rx))
}

/// Build a syntactically valid TLS 1.2 ClientHello carrying `sni`, padded
/// with a padding extension to exactly `total_len` bytes when possible.
pub fn build_client_hello(sni: &str, total_len: usize) -> Vec<u8> {
    let name = sni.as_bytes();

    let mut extensions = Vec::new();
    // server_name extension
    let list_len = name.len() + 3;
    extensions.extend_from_slice(&0x0000u16.to_be_bytes());
    extensions.extend_from_slice(&((list_len + 2) as u16).to_be_bytes());
    extensions.extend_from_slice(&(list_len as u16).to_be_bytes());
    extensions.push(0x00);
    extensions.extend_from_slice(&(name.len() as u16).to_be_bytes());
    extensions.extend_from_slice(name);

    // body length before padding: handshake header 4 + version 2 +
    // random 32 + session 1 + ciphers 6 + compression 2 + ext length 2
    let base_body = 4 + 2 + 32 + 1 + 6 + 2 + 2 + extensions.len();
    let base_total = 5 + base_body;
    if total_len > base_total + 4 {
        let pad = total_len - base_total - 4;
        extensions.extend_from_slice(&0x0015u16.to_be_bytes());
        extensions.extend_from_slice(&(pad as u16).to_be_bytes());
        extensions.resize(extensions.len() + pad, 0x00);
    }

    let body_len = 4 + 2 + 32 + 1 + 6 + 2 + 2 + extensions.len();

    let mut hello = Vec::with_capacity(5 + body_len);
    hello.push(0x16);
    hello.extend_from_slice(&[0x03, 0x01]);
    hello.extend_from_slice(&(body_len as u16).to_be_bytes());

    hello.push(0x01);
    let handshake_len = (body_len - 4) as u32;
    hello.extend_from_slice(&handshake_len.to_be_bytes()[1..]);

    hello.extend_from_slice(&[0x03, 0x03]);
    hello.extend_from_slice(&[0xAB; 32]);
    hello.push(0x00); // empty session id
    hello.extend_from_slice(&0x0004u16.to_be_bytes());
    hello.extend_from_slice(&[0x13, 0x01, 0x13, 0x02]);
    hello.push(0x01); // one compression method
    hello.push(0x00);
    hello.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    hello.extend_from_slice(&extensions);

    hello
}
