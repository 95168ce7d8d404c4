//! SOCKS5 CONNECT handling. Only CMD=0x01 is supported; BIND and UDP
//! ASSOCIATE get a command-not-supported reply.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::info;

use crate::error::Result;
use crate::proxy::relay;
use crate::proxy::server::ProxyContext;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const REPLY_GREETING: &[u8] = b"\x05\x00";
const REPLY_SUCCESS: &[u8] = b"\x05\x00\x00\x01\x00\x00\x00\x00\x00\x00";
const REPLY_HOST_UNREACHABLE: &[u8] = b"\x05\x04\x00\x01\x00\x00\x00\x00\x00\x00";
const REPLY_CONN_REFUSED: &[u8] = b"\x05\x05\x00\x01\x00\x00\x00\x00\x00\x00";
const REPLY_CMD_UNSUPPORTED: &[u8] = b"\x05\x07\x00\x01\x00\x00\x00\x00\x00\x00";
const REPLY_ATYP_UNSUPPORTED: &[u8] = b"\x05\x08\x00\x01\x00\x00\x00\x00\x00\x00";

/// Reads that drain the already-buffered first bytes before touching the
/// socket again, so a client that pipelines its request straight after
/// the greeting still parses correctly.
struct BufferedReader<'a> {
    stream: &'a mut TcpStream,
    buffer: Vec<u8>,
    pos: usize,
}

impl<'a> BufferedReader<'a> {
    fn new(stream: &'a mut TcpStream, buffer: Vec<u8>) -> Self {
        Self { stream, buffer, pos: 0 }
    }

    async fn read_exact(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        let mut filled = 0usize;
        while filled < out.len() {
            if self.pos < self.buffer.len() {
                let take = (out.len() - filled).min(self.buffer.len() - self.pos);
                out[filled..filled + take]
                    .copy_from_slice(&self.buffer[self.pos..self.pos + take]);
                self.pos += take;
                filled += take;
            } else {
                let n = self.stream.read(&mut out[filled..]).await?;
                if n == 0 {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                filled += n;
            }
        }
        Ok(())
    }

    fn leftover(mut self) -> Vec<u8> {
        self.buffer.split_off(self.pos.min(self.buffer.len()))
    }
}

pub async fn handle(
    ctx: &ProxyContext,
    mut client: TcpStream,
    first_bytes: &[u8],
    conn_id: &str,
) -> Result<()> {
    if first_bytes.len() < 2 || first_bytes[0] != 0x05 {
        return Ok(());
    }
    let nmethods = first_bytes[1] as usize;

    let mut reader = BufferedReader::new(&mut client, first_bytes[2..].to_vec());
    let mut methods = vec![0u8; nmethods];
    reader.read_exact(&mut methods).await?;

    // greeting reply comes before the request, so split the borrow here
    let buffered = reader.leftover();
    client.write_all(REPLY_GREETING).await?;
    let mut reader = BufferedReader::new(&mut client, buffered);

    let mut request = [0u8; 4];
    reader.read_exact(&mut request).await?;
    let [_ver, cmd, _rsv, atyp] = request;

    if cmd != 0x01 {
        drop(reader);
        client.write_all(REPLY_CMD_UNSUPPORTED).await?;
        return Ok(());
    }

    let host = match atyp {
        0x01 => {
            let mut addr = [0u8; 4];
            reader.read_exact(&mut addr).await?;
            format!("{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])
        }
        0x03 => {
            let mut len = [0u8; 1];
            reader.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            reader.read_exact(&mut name).await?;
            match String::from_utf8(name) {
                Ok(name) => name,
                Err(_) => return Ok(()),
            }
        }
        0x04 => {
            let mut addr = [0u8; 16];
            reader.read_exact(&mut addr).await?;
            addr.iter().map(|b| format!("{b:02x}")).collect()
        }
        _ => {
            drop(reader);
            client.write_all(REPLY_ATYP_UNSUPPORTED).await?;
            return Ok(());
        }
    };

    let mut port_buf = [0u8; 2];
    reader.read_exact(&mut port_buf).await?;
    let port = u16::from_be_bytes(port_buf);
    let initial = reader.leftover();

    info!(conn = conn_id, %host, port, "SOCKS5 request");

    if ctx.bypass.should_bypass_domain(&host) {
        info!(conn = conn_id, %host, "bypass");
        ctx.stats.record_bypass(conn_id, "domain_bypass").await;
    } else {
        info!(conn = conn_id, %host, "tunnel");
        ctx.stats.record_tunnel(conn_id).await;
    }

    let Some(ip) = ctx.dns.resolve(&host).await else {
        client.write_all(REPLY_HOST_UNREACHABLE).await?;
        return Ok(());
    };

    let remote = match timeout(CONNECT_TIMEOUT, TcpStream::connect((ip, port))).await {
        Ok(Ok(remote)) => remote,
        _ => {
            client.write_all(REPLY_CONN_REFUSED).await?;
            return Ok(());
        }
    };

    client.write_all(REPLY_SUCCESS).await?;

    relay::relay_bidirectional(client, remote, initial, conn_id, ctx.relay_config(), &ctx.stats)
        .await;
    Ok(())
}
