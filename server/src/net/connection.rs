use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::command::Command;
use crate::engine::user_session::ClientSession;
use crate::error::{BroadcasterClosed, TransportError};
use crate::state::RelayState;

use super::formatter::{self, ChatLine, NO_HISTORY};
use super::session::{self, LineWriter};

/// Time allowed for already queued lines to reach a departing client.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle a single client connection from accept to close.
/// Accepts any stream implementing AsyncRead + AsyncWrite.
pub async fn handle_connection<S>(stream: S, peer: String, state: RelayState)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    info!(%peer, "client connected");

    let (mut reader, writer) = session::split(stream);
    let session_id = Uuid::new_v4();

    // Direct replies are bounded too; a full queue stalls this client's read loop
    let (reply_tx, reply_rx) = mpsc::channel::<String>(state.reply_queue.max(1));
    // Broadcast deliveries are bounded; the broadcaster drops lines when full
    let (deliver_tx, deliver_rx) = mpsc::channel::<String>(state.outbound_queue.max(1));

    let mut write_handle = tokio::spawn(write_loop(writer, reply_rx, deliver_rx));
    let mut writer_finished = false;

    let session = ClientSession::new(session_id, peer.clone(), deliver_tx);
    if state.broadcaster.join(session).await.is_err() {
        warn!(%peer, "broadcaster unavailable, dropping connection");
        write_handle.abort();
        return;
    }

    loop {
        let line = tokio::select! {
            result = reader.read_line() => match result {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    debug!(%peer, error = %e, "read failed");
                    break;
                }
            },
            result = &mut write_handle => {
                writer_finished = true;
                log_writer_exit(&peer, result);
                break;
            }
        };

        if handle_line(&state, &line, &reply_tx).await.is_err() {
            warn!(%peer, "broadcaster unavailable, dropping connection");
            break;
        }
    }

    // Once the broadcaster forgets the session both queues close and the
    // writer flushes what is left. It may already have removed us after a
    // failed delivery.
    drop(reply_tx);
    let _ = state.broadcaster.leave(session_id).await;

    if !writer_finished {
        match tokio::time::timeout(DRAIN_TIMEOUT, &mut write_handle).await {
            Ok(result) => log_writer_exit(&peer, result),
            Err(_) => {
                warn!(%peer, "timed out flushing replies to departing client");
                write_handle.abort();
            }
        }
    }
    info!(%peer, %session_id, "client disconnected");
}

fn log_writer_exit(peer: &str, result: Result<Result<(), TransportError>, JoinError>) {
    match result {
        Ok(Err(e)) => debug!(%peer, error = %e, "write failed"),
        Ok(Ok(())) => {}
        Err(e) => warn!(%peer, error = %e, "writer task ended abnormally"),
    }
}

/// Dispatch one received line.
async fn handle_line(
    state: &RelayState,
    line: &str,
    reply_tx: &mpsc::Sender<String>,
) -> Result<(), BroadcasterClosed> {
    match Command::classify(line) {
        Command::History => {
            for line in history_reply(state).await {
                if !send_line(reply_tx, line).await {
                    break;
                }
            }
        }
        Command::UserCount => {
            let count = state.broadcaster.count().await?;
            send_line(reply_tx, formatter::user_count(count)).await;
        }
        Command::Chat(text) => {
            let chat = ChatLine::received_now(text);
            debug!(sender = chat.sender().unwrap_or("-"), text = %chat.text, "received");

            if let Err(e) = state.history.append(&chat.text).await {
                warn!(error = %e, "failed to save chat history");
            }
            state.broadcaster.broadcast(chat.render()).await?;
        }
    }
    Ok(())
}

/// Lines answering a history request: every stored line, or the sentinel.
async fn history_reply(state: &RelayState) -> Vec<String> {
    let lines = match state.history.read_all().await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(error = %e, "failed to read chat history");
            Vec::new()
        }
    };
    if lines.is_empty() {
        vec![NO_HISTORY.to_string()]
    } else {
        lines
    }
}

/// Queue a direct reply, waiting while the client is behind. Returns false
/// once the writer is gone; the read loop notices on its next iteration.
async fn send_line(tx: &mpsc::Sender<String>, line: String) -> bool {
    tx.send(line).await.is_ok()
}

/// Drain direct replies and broadcast deliveries onto the socket until a
/// write fails or both queues close.
async fn write_loop<W>(
    mut writer: LineWriter<W>,
    mut replies: mpsc::Receiver<String>,
    mut deliveries: mpsc::Receiver<String>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let line = tokio::select! {
            Some(line) = replies.recv() => line,
            Some(line) = deliveries.recv() => line,
            else => break,
        };
        writer.write_line(&line).await?;
    }
    let _ = writer.shutdown().await;
    Ok(())
}
