//! Connection handling: accept loop, line framing and keep-alive

use crate::{ClientId, Message, MessageType, Result, Server};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Longest inbound line accepted, CRLF excluded
pub const MAX_LINE_LENGTH: usize = 512;

/// How often the keep-alive state is checked
const KEEPALIVE_TICK: Duration = Duration::from_secs(1);

/// Accept connections until the listener fails
///
/// Every connection task is spawned on `tracker`, so a caller shutting the
/// server down can close it and wait for queued lines to reach the sockets.
pub async fn serve(server: Arc<Server>, listener: TcpListener, tracker: TaskTracker) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (mut stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let max_clients = server.config().server.max_clients;
        if server.registry().client_count() >= max_clients {
            warn!("Rejecting {}: {} connections already open", remote_addr, max_clients);
            let refusal = Message::new(
                MessageType::Error,
                vec!["Closing Link: *[*] (Server is full)".to_string()],
            );
            let _ = stream.write_all(refusal.to_line().as_bytes()).await;
            continue;
        }

        let server = server.clone();
        tracker.spawn(async move {
            if let Err(e) = handle_connection(server, stream, remote_addr).await {
                error!("Error handling connection from {}: {}", remote_addr, e);
            }
        });
    }
}

/// Drive one client connection to completion
pub async fn handle_connection(server: Arc<Server>, stream: TcpStream, remote_addr: SocketAddr) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    let (sender, receiver) = mpsc::unbounded_channel();

    let id = server.connect(remote_addr.to_string(), sender);
    let writer = tokio::spawn(write_messages(id, write_half, receiver));

    let reason = read_messages(&server, id, read_half).await;
    // No-op when QUIT or KILL already tore the session down
    server.disconnect(id, reason);

    if let Err(e) = writer.await {
        warn!("Writer task for {} failed: {}", id, e);
    }
    debug!("Connection from {} closed", remote_addr);
    Ok(())
}

/// Drain the session queue onto the socket until the registry drops the sender
async fn write_messages(id: ClientId, mut writer: OwnedWriteHalf, mut receiver: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = receiver.recv().await {
        if let Err(e) = writer.write_all(message.to_line().as_bytes()).await {
            debug!("Error writing to client {}: {}", id, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

/// Feed inbound lines to the server; returns the teardown reason
async fn read_messages(server: &Server, id: ClientId, reader: OwnedReadHalf) -> &'static str {
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let ping_interval = Duration::from_secs(server.config().connection.ping_interval);
    let ping_timeout = Duration::from_secs(server.config().connection.ping_timeout);

    let mut ticker = tokio::time::interval(KEEPALIVE_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();
    let mut ping_sent = false;

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    last_seen = Instant::now();
                    ping_sent = false;
                    server.handle_line(id, &line);
                    if !server.is_connected(&id) {
                        return "Client quit";
                    }
                }
                Some(Err(e)) => {
                    debug!("Read error from {}: {}", id, e);
                    return "Read error";
                }
                None => return "Connection closed",
            },
            _ = ticker.tick() => {
                // Torn down from elsewhere (KILL, shutdown)
                if !server.is_connected(&id) {
                    return "Connection closed";
                }
                let idle = last_seen.elapsed();
                if idle >= ping_timeout {
                    return "Ping timeout";
                }
                if idle >= ping_interval && !ping_sent {
                    let ping = Message::new(MessageType::Ping, vec![server.name().to_string()]);
                    server.reply(&id, ping);
                    ping_sent = true;
                }
            }
        }
    }
}
