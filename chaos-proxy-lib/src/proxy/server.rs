use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bypass::BypassList;
use crate::config::{BufferConfig, ChaosConfig, EvasionConfig};
use crate::dns::DnsResolver;
use crate::error::Result;
use crate::fronting::DomainFronter;
use crate::proxy::detect::{detect, Protocol};
use crate::proxy::limiter::ConnectionLimiter;
use crate::proxy::relay::RelayConfig;
use crate::proxy::{http, socks5, websocket};
use crate::stats::StatsCollector;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(1);
const FIRST_BYTES_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a connection task needs, shared behind one `Arc`. The chaos
/// engine is deliberately absent: each relay builds its own.
pub struct ProxyContext {
    pub dns: DnsResolver,
    pub bypass: BypassList,
    pub fronter: DomainFronter,
    pub stats: StatsCollector,
    pub limiter: ConnectionLimiter,
    pub buffers: BufferConfig,
    pub chaos: ChaosConfig,
    pub evasion: EvasionConfig,
}

impl ProxyContext {
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            aggressive: self.chaos.aggressive,
            record_randomization: self.evasion.record_randomization,
            read_buffer: self.buffers.medium,
        }
    }
}

/// Accept loop. Runs until the shutdown channel flips, then aborts every
/// in-flight connection task.
pub async fn run(
    ctx: Arc<ProxyContext>,
    listener: TcpListener,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), "proxy listening");

    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            result = listener.accept() => {
                let (client, addr) = match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let ctx = ctx.clone();
                tasks.spawn(async move {
                    handle_connection(ctx, client, addr).await;
                });
            }
            res = shutdown.changed() => {
                if res.is_ok() {
                    info!("shutdown signal received, stopping accept loop");
                } else {
                    debug!("shutdown channel closed, stopping accept loop");
                }
                break;
            }
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    if !tasks.is_empty() {
        info!(active = tasks.len(), "cancelling in-flight connections");
    }
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}

    Ok(())
}

async fn handle_connection(ctx: Arc<ProxyContext>, mut client: TcpStream, addr: SocketAddr) {
    // dropping the socket without a permit closes it with no reply
    let Some(_permit) = ctx.limiter.acquire(ACQUIRE_TIMEOUT).await else {
        warn!(%addr, "connection rejected (limit reached)");
        return;
    };

    let conn_id = short_id();

    let mut buf = vec![0u8; ctx.buffers.small];
    let n = match timeout(FIRST_BYTES_TIMEOUT, client.read(&mut buf)).await {
        Ok(Ok(0)) => return,
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            debug!(conn = %conn_id, %addr, error = %e, "first read failed");
            return;
        }
        Err(_) => {
            warn!(conn = %conn_id, %addr, "timed out waiting for first bytes");
            return;
        }
    };
    let first_bytes = &buf[..n];

    let Some(protocol) = detect(first_bytes) else {
        warn!(conn = %conn_id, %addr, "unknown protocol");
        return;
    };
    info!(conn = %conn_id, %addr, protocol = protocol.name(), "connection accepted");

    ctx.stats
        .connection_started(&conn_id, protocol.name(), &addr.to_string())
        .await;

    let result = match protocol {
        Protocol::Http => http::handle(&ctx, client, first_bytes, &conn_id).await,
        Protocol::Socks5 => socks5::handle(&ctx, client, first_bytes, &conn_id).await,
        Protocol::WebSocket => websocket::handle(&ctx, client, first_bytes, &conn_id).await,
    };

    match result {
        Ok(()) => ctx.stats.connection_ended(&conn_id, true).await,
        Err(e) => {
            warn!(conn = %conn_id, %addr, error = %e, "handler error");
            ctx.stats.connection_ended(&conn_id, false).await;
        }
    }
}

fn short_id() -> String {
    let id = Uuid::new_v4();
    id.simple().to_string()[..8].to_string()
}
