//! WebSocket tunneling: complete the upgrade handshake ourselves, then
//! carry client frames to the upstream as raw bytes and wrap upstream
//! bytes as binary frames. WS framing already breaks up the byte stream,
//! so no ClientHello fragmentation happens on this path.

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::proxy::server::ProxyContext;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const WS_ACCEPT_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const OPCODE_CLOSE: u8 = 8;
const OPCODE_PING: u8 = 9;
const OPCODE_PONG: u8 = 10;

pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_ACCEPT_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

fn parse_headers(request: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in request.split("\r\n").skip(1) {
        if let Some((key, value)) = line.split_once(": ") {
            headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }
    headers
}

pub async fn handle(
    ctx: &ProxyContext,
    mut client: TcpStream,
    first_bytes: &[u8],
    conn_id: &str,
) -> Result<()> {
    let request = String::from_utf8_lossy(first_bytes);
    let headers = parse_headers(&request);

    let ws_key = headers.get("sec-websocket-key").cloned().unwrap_or_default();
    let host_header = headers.get("host").cloned().unwrap_or_default();
    let (host, port) = match host_header.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>().unwrap_or(80)),
        None => (host_header.clone(), 80),
    };

    if host.is_empty() {
        return Ok(());
    }

    let handshake = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        accept_key(&ws_key)
    );
    client.write_all(handshake.as_bytes()).await?;

    // informational on this path; WS traffic is tunneled either way
    let bypass = ctx.bypass.should_bypass_domain(&host);
    info!(conn = conn_id, %host, port, bypass, "WebSocket tunnel");

    let Some(ip) = ctx.dns.resolve(&host).await else {
        warn!(conn = conn_id, %host, "DNS resolution failed for WebSocket host");
        return Ok(());
    };

    let remote = match timeout(CONNECT_TIMEOUT, TcpStream::connect((ip, port))).await {
        Ok(Ok(remote)) => remote,
        Ok(Err(e)) => {
            warn!(conn = conn_id, %host, error = %e, "WebSocket upstream connect failed");
            return Ok(());
        }
        Err(_) => {
            warn!(conn = conn_id, %host, "WebSocket upstream connect timed out");
            return Ok(());
        }
    };

    relay_ws(ctx, client, remote, conn_id).await;
    Ok(())
}

async fn relay_ws(ctx: &ProxyContext, client: TcpStream, remote: TcpStream, conn_id: &str) {
    let (mut client_read, mut client_write) = client.into_split();
    let (mut remote_read, mut remote_write) = remote.into_split();

    let conn = conn_id.to_string();
    let client_to_remote = async move {
        let mut total_sent = 0u64;
        loop {
            let mut header = [0u8; 2];
            if client_read.read_exact(&mut header).await.is_err() {
                break;
            }
            let opcode = header[0] & 0x0F;
            let masked = header[1] & 0x80 != 0;
            let mut payload_len = (header[1] & 0x7F) as u64;

            let read_result = async {
                if payload_len == 126 {
                    let mut ext = [0u8; 2];
                    client_read.read_exact(&mut ext).await?;
                    payload_len = u16::from_be_bytes(ext) as u64;
                } else if payload_len == 127 {
                    let mut ext = [0u8; 8];
                    client_read.read_exact(&mut ext).await?;
                    payload_len = u64::from_be_bytes(ext);
                }

                let mut mask_key = [0u8; 4];
                if masked {
                    client_read.read_exact(&mut mask_key).await?;
                }

                let mut payload = vec![0u8; payload_len as usize];
                client_read.read_exact(&mut payload).await?;

                if masked {
                    for (i, byte) in payload.iter_mut().enumerate() {
                        *byte ^= mask_key[i % 4];
                    }
                }
                Ok::<Vec<u8>, std::io::Error>(payload)
            }
            .await;

            let payload = match read_result {
                Ok(payload) => payload,
                Err(e) => {
                    debug!(conn = %conn, error = %e, "WS client->remote read error");
                    break;
                }
            };

            if opcode == OPCODE_CLOSE {
                break;
            }
            if opcode == OPCODE_PING || opcode == OPCODE_PONG {
                continue;
            }
            if payload.is_empty() {
                continue;
            }
            if let Err(e) = remote_write.write_all(&payload).await {
                debug!(conn = %conn, error = %e, "WS client->remote write error");
                break;
            }
            total_sent += payload.len() as u64;
        }
        let _ = remote_write.shutdown().await;
        total_sent
    };

    let conn = conn_id.to_string();
    let buffer = ctx.buffers.medium;
    let remote_to_client = async move {
        let mut total_received = 0u64;
        let mut buf = vec![0u8; buffer];
        loop {
            let n = match remote_read.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(conn = %conn, error = %e, "WS remote->client read error");
                    break;
                }
            };

            let mut frame = Vec::with_capacity(n + 10);
            frame.push(0x82); // FIN + binary
            if n < 126 {
                frame.push(n as u8);
            } else if n < 65_536 {
                frame.push(126);
                frame.extend_from_slice(&(n as u16).to_be_bytes());
            } else {
                frame.push(127);
                frame.extend_from_slice(&(n as u64).to_be_bytes());
            }
            frame.extend_from_slice(&buf[..n]);

            if let Err(e) = client_write.write_all(&frame).await {
                debug!(conn = %conn, error = %e, "WS remote->client write error");
                break;
            }
            total_received += n as u64;
        }
        let _ = client_write.shutdown().await;
        total_received
    };

    let (sent, received) = tokio::join!(client_to_remote, remote_to_client);
    if sent > 0 || received > 0 {
        ctx.stats.record_traffic(conn_id, sent, received).await;
    }
}
