//! HTTP CONNECT tunneling and plain forward proxying.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::Result;
use crate::proxy::relay;
use crate::proxy::server::ProxyContext;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const REPLY_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";
const REPLY_BAD_GATEWAY: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\n\r\n";
const REPLY_GATEWAY_TIMEOUT: &[u8] = b"HTTP/1.1 504 Gateway Timeout\r\n\r\n";

/// Hosts never rewritten by domain fronting; fronting Google-family
/// domains through a Google edge defeats the purpose and breaks logins.
const NO_FRONT_DOMAINS: [&str; 11] = [
    "google.com",
    "youtube.com",
    "googleapis.com",
    "gstatic.com",
    "googlevideo.com",
    "ggpht.com",
    "googleusercontent.com",
    "ytimg.com",
    "youtu.be",
    "gmail.com",
    "accounts.google.com",
];

pub async fn handle(
    ctx: &ProxyContext,
    client: TcpStream,
    first_bytes: &[u8],
    conn_id: &str,
) -> Result<()> {
    let request_line = first_bytes
        .split(|&b| b == b'\r')
        .next()
        .unwrap_or_default();
    let request_line = String::from_utf8_lossy(request_line);
    let mut parts = request_line.split(' ');
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(());
    };
    if target.is_empty() {
        return Ok(());
    }

    info!(conn = conn_id, method, target, "HTTP request");

    if method == "CONNECT" {
        handle_connect(ctx, client, target, conn_id).await
    } else {
        handle_forward(ctx, client, target, first_bytes, conn_id).await
    }
}

async fn handle_connect(
    ctx: &ProxyContext,
    mut client: TcpStream,
    target: &str,
    conn_id: &str,
) -> Result<()> {
    let (host, port) = match target.split_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, port),
            Err(_) => return Ok(()),
        },
        None => (target, 443),
    };

    let bypass = ctx.bypass.should_bypass_domain(host);
    if bypass {
        info!(conn = conn_id, host, "bypass");
        ctx.stats.record_bypass(conn_id, "domain_bypass").await;
    } else {
        info!(conn = conn_id, host, "tunnel");
        ctx.stats.record_tunnel(conn_id).await;
    }

    let mut connect_host = host.to_string();
    if !bypass && port == 443 && can_front(host) {
        if let Some(front) = ctx.fronter.select_front_domain(None, Some(host)) {
            connect_host = front;
        }
    }

    let Some(remote) = connect_upstream(ctx, &mut client, &connect_host, port, conn_id).await?
    else {
        return Ok(());
    };

    client.write_all(REPLY_ESTABLISHED).await?;

    relay::relay_bidirectional(client, remote, Vec::new(), conn_id, ctx.relay_config(), &ctx.stats)
        .await;
    Ok(())
}

/// Non-CONNECT requests: the absolute URL picks the upstream, and the
/// client's original bytes are forwarded unchanged as the first write.
async fn handle_forward(
    ctx: &ProxyContext,
    mut client: TcpStream,
    target: &str,
    first_bytes: &[u8],
    conn_id: &str,
) -> Result<()> {
    let Ok(uri) = target.parse::<http::Uri>() else {
        return Ok(());
    };
    let host = uri
        .host()
        .map(str::to_string)
        .unwrap_or_else(|| uri.path().split('/').next().unwrap_or_default().to_string());
    if host.is_empty() {
        return Ok(());
    }
    let port = uri.port_u16().unwrap_or(80);

    let bypass = ctx.bypass.should_bypass_domain(&host);
    if bypass {
        info!(conn = conn_id, %host, "bypass HTTP");
        ctx.stats.record_bypass(conn_id, "domain_bypass").await;
    } else {
        info!(conn = conn_id, %host, "tunnel HTTP");
        ctx.stats.record_tunnel(conn_id).await;
    }

    let Some(remote) = connect_upstream(ctx, &mut client, &host, port, conn_id).await? else {
        return Ok(());
    };

    relay::relay_bidirectional(
        client,
        remote,
        first_bytes.to_vec(),
        conn_id,
        ctx.relay_config(),
        &ctx.stats,
    )
    .await;
    Ok(())
}

fn can_front(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    !NO_FRONT_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Resolve and dial the upstream, writing the appropriate HTTP error
/// reply on failure. `Ok(None)` means the reply was sent and the
/// connection is done.
async fn connect_upstream(
    ctx: &ProxyContext,
    client: &mut TcpStream,
    host: &str,
    port: u16,
    conn_id: &str,
) -> Result<Option<TcpStream>> {
    let Some(ip) = ctx.dns.resolve(host).await else {
        warn!(conn = conn_id, host, "DNS resolution failed");
        client.write_all(REPLY_BAD_GATEWAY).await?;
        return Ok(None);
    };

    match timeout(CONNECT_TIMEOUT, TcpStream::connect((ip, port))).await {
        Ok(Ok(remote)) => Ok(Some(remote)),
        Ok(Err(e)) => {
            warn!(conn = conn_id, host, port, error = %e, "upstream connect failed");
            client.write_all(REPLY_BAD_GATEWAY).await?;
            Ok(None)
        }
        Err(_) => {
            warn!(conn = conn_id, host, port, "upstream connect timed out");
            client.write_all(REPLY_GATEWAY_TIMEOUT).await?;
            Ok(None)
        }
    }
}
