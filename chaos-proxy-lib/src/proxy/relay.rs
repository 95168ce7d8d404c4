//! The bidirectional byte pump. Two halves run concurrently; only the
//! first client->remote write is special-cased, where a TLS ClientHello is
//! written as a jittered fragment plan instead of one chunk.

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::chaos::ChaosEngine;
use crate::stats::StatsCollector;
use crate::tls::{Fragment, Fragmenter};

#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    pub aggressive: bool,
    pub record_randomization: bool,
    pub read_buffer: usize,
}

/// Pump bytes between `client` and `remote` until both directions are
/// done, then fold the byte counts and the chaos summary into the stats.
///
/// `initial` is data the handler already consumed from the client (the
/// buffered request bytes, or nothing after a CONNECT reply); it is
/// treated as the first client->remote read.
pub async fn relay_bidirectional(
    client: TcpStream,
    remote: TcpStream,
    initial: Vec<u8>,
    conn_id: &str,
    config: RelayConfig,
    stats: &StatsCollector,
) {
    let fragmenter = Fragmenter::new(config.aggressive);
    let mut engine = ChaosEngine::new(Uuid::new_v4().as_bytes());

    let (mut client_read, mut client_write) = client.into_split();
    let (mut remote_read, mut remote_write) = remote.into_split();

    let conn = conn_id.to_string();
    let client_to_remote = async move {
        let mut total_sent = 0u64;
        let mut first = true;
        let mut buf = vec![0u8; config.read_buffer];

        if !initial.is_empty() {
            first = false;
            let plan = fragmenter.plan(&mut engine, &initial);
            if write_plan(&mut remote_write, &initial, &plan).await.is_ok() {
                total_sent += initial.len() as u64;
            } else {
                let _ = remote_write.shutdown().await;
                return (total_sent, engine.metrics());
            }
        }

        loop {
            let n = match client_read.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(conn = %conn, error = %e, "client->remote read error");
                    break;
                }
            };
            let data = &buf[..n];

            let result = if first {
                first = false;
                let plan = fragmenter.plan(&mut engine, data);
                write_plan(&mut remote_write, data, &plan).await
            } else if config.record_randomization {
                let plan = fragmenter.randomize_record_size(&mut engine, data);
                write_plan(&mut remote_write, data, &plan).await
            } else {
                remote_write.write_all(data).await
            };

            match result {
                Ok(()) => total_sent += n as u64,
                Err(e) => {
                    debug!(conn = %conn, error = %e, "client->remote write error");
                    break;
                }
            }
        }

        let _ = remote_write.shutdown().await;
        (total_sent, engine.metrics())
    };

    let conn = conn_id.to_string();
    let remote_to_client = async move {
        let mut total_received = 0u64;
        let mut buf = vec![0u8; config.read_buffer];
        loop {
            let n = match remote_read.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(conn = %conn, error = %e, "remote->client read error");
                    break;
                }
            };
            if let Err(e) = client_write.write_all(&buf[..n]).await {
                debug!(conn = %conn, error = %e, "remote->client write error");
                break;
            }
            total_received += n as u64;
        }
        let _ = client_write.shutdown().await;
        total_received
    };

    let ((sent, chaos), received) = tokio::join!(client_to_remote, remote_to_client);

    if sent > 0 || received > 0 {
        stats.record_traffic(conn_id, sent, received).await;
    }
    stats.record_chaos_metrics(chaos).await;
}

/// Write `data` according to `plan`: each entry is a slice boundary and a
/// pause honored before the next write.
async fn write_plan<W>(writer: &mut W, data: &[u8], plan: &[Fragment]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut prev = 0usize;
    for fragment in plan {
        writer.write_all(&data[prev..fragment.end]).await?;
        writer.flush().await?;
        if !fragment.delay.is_zero() {
            sleep(fragment.delay).await;
        }
        prev = fragment.end;
    }
    Ok(())
}
