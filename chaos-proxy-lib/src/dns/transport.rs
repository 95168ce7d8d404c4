//! DoH and DoT clients. Both drive their own TLS session through
//! `tokio-rustls` with the webpki root store; certificate chains and
//! hostnames are verified. Every connect and read is bounded by a 5 s
//! timeout.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::config::{DohServer, DotServer};
use crate::dns::wire;
use crate::error::{ProxyError, Result};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| ProxyError::Tls(format!("invalid server name {host}: {e}")))
}

/// Query one DoH server with a manually driven HTTP/1.1 GET. The dial
/// target is `server.ip` when present (so bootstrapping never recurses
/// through the resolver); SNI and Host come from the URL.
pub(crate) async fn query_doh(
    connector: &TlsConnector,
    server: &DohServer,
    hostname: &str,
) -> Result<Ipv4Addr> {
    let url = server.url.strip_prefix("https://").unwrap_or(&server.url);
    let (host, path) = match url.split_once('/') {
        Some((host, rest)) => (host, format!("/{rest}")),
        None => (url, "/dns-query".to_string()),
    };
    let dial = server.ip.as_deref().unwrap_or(host);

    let tcp = timeout(QUERY_TIMEOUT, TcpStream::connect((dial, 443)))
        .await
        .map_err(|_| ProxyError::ConnectTimeout)??;
    let mut stream = timeout(QUERY_TIMEOUT, connector.connect(server_name(host)?, tcp))
        .await
        .map_err(|_| ProxyError::ConnectTimeout)??;

    let request = format!(
        "GET {path}?name={hostname}&type=A HTTP/1.1\r\n\
         Host: {host}\r\n\
         Accept: application/dns-json\r\n\
         Connection: close\r\n\
         \r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = timeout(QUERY_TIMEOUT, stream.read(&mut buf))
            .await
            .map_err(|_| ProxyError::ConnectTimeout)??;
        if n == 0 {
            break;
        }
        response.extend_from_slice(&buf[..n]);
    }

    let response = String::from_utf8_lossy(&response);
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .ok_or_else(|| ProxyError::Unresolved(hostname.to_string()))?;

    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProxyError::Unresolved(format!("{hostname}: bad DoH body: {e}")))?;

    if let Some(answers) = parsed.get("Answer").and_then(|a| a.as_array()) {
        for answer in answers {
            if answer.get("type").and_then(|t| t.as_u64()) == Some(1) {
                if let Some(ip) = answer
                    .get("data")
                    .and_then(|d| d.as_str())
                    .and_then(|d| d.parse::<Ipv4Addr>().ok())
                {
                    debug!(host = hostname, %ip, server = %server.name, "DoH answer");
                    return Ok(ip);
                }
            }
        }
    }

    Err(ProxyError::Unresolved(hostname.to_string()))
}

/// Query one DoT server: a length-prefixed wire-format exchange over TLS.
pub(crate) async fn query_dot(
    connector: &TlsConnector,
    server: &DotServer,
    hostname: &str,
) -> Result<Ipv4Addr> {
    let sni = server.hostname.as_deref().unwrap_or(&server.host);

    let tcp = timeout(QUERY_TIMEOUT, TcpStream::connect((server.host.as_str(), server.port)))
        .await
        .map_err(|_| ProxyError::ConnectTimeout)??;
    let mut stream = timeout(QUERY_TIMEOUT, connector.connect(server_name(sni)?, tcp))
        .await
        .map_err(|_| ProxyError::ConnectTimeout)??;

    let query = wire::build_query(rand::rng().random(), hostname);
    let mut framed = Vec::with_capacity(query.len() + 2);
    framed.extend_from_slice(&(query.len() as u16).to_be_bytes());
    framed.extend_from_slice(&query);
    stream.write_all(&framed).await?;

    let mut len_buf = [0u8; 2];
    timeout(QUERY_TIMEOUT, stream.read_exact(&mut len_buf))
        .await
        .map_err(|_| ProxyError::ConnectTimeout)??;
    let response_len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; response_len];
    timeout(QUERY_TIMEOUT, stream.read_exact(&mut response))
        .await
        .map_err(|_| ProxyError::ConnectTimeout)??;

    let ip = wire::parse_response(&response)
        .ok_or_else(|| ProxyError::Unresolved(hostname.to_string()))?;
    debug!(host = hostname, %ip, server = %server.name, "DoT answer");
    Ok(ip)
}
