//! Minimal stats endpoint: one-shot HTTP responses straight off a TCP
//! listener, no server framework. Serves the JSON snapshot consumed by
//! dashboards and `/healthz` for probes.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::proxy::ProxyContext;

pub async fn serve_stats(addr: SocketAddr, ctx: Arc<ProxyContext>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "stats endpoint listening");
    loop {
        let (stream, _peer) = listener.accept().await?;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = respond(stream, ctx).await {
                debug!(error = %e, "stats request failed");
            }
        });
    }
}

async fn respond(mut stream: TcpStream, ctx: Arc<ProxyContext>) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request
        .split_whitespace()
        .nth(1)
        .unwrap_or("/");

    let (status, content_type, body) = match path {
        "/healthz" => ("200 OK", "text/plain", "ok\n".to_string()),
        "/" | "/api/stats" => {
            let payload = serde_json::json!({
                "stats": ctx.stats.snapshot().await,
                "dns": ctx.dns.cache_stats(),
                "limits": ctx.limiter.stats(),
            });
            ("200 OK", "application/json", payload.to_string())
        }
        _ => ("404 Not Found", "text/plain", "not found\n".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
