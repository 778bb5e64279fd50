use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Unique identifier for a connected session (one per accepted connection).
pub type SessionId = Uuid;

/// Default number of queued broadcast lines per session before new ones are dropped.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 1024;

/// Default number of queued direct replies per session before the handler waits.
pub const DEFAULT_REPLY_QUEUE: usize = 64;

/// Outcome of handing a broadcast line to a session's writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the writer task.
    Queued,
    /// The peer's queue is full; this line was dropped for that peer only.
    Dropped,
    /// The writer task is gone (its last write failed or the connection closed).
    Closed,
}

/// The broadcaster's view of one connected client. The connection handler owns
/// the socket; the registry only holds the sending side of its delivery queue.
#[derive(Debug)]
pub struct ClientSession {
    pub id: SessionId,
    /// Remote address, for logging.
    pub peer: String,
    outbound: mpsc::Sender<String>,
    pub connected_at: DateTime<Utc>,
}

impl ClientSession {
    pub fn new(id: SessionId, peer: String, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            peer,
            outbound,
            connected_at: Utc::now(),
        }
    }

    /// How long the session has been registered.
    pub fn connected_for(&self) -> TimeDelta {
        Utc::now() - self.connected_at
    }

    /// Queue a line for this session without blocking. A slow peer never
    /// stalls delivery to the others.
    pub fn deliver(&self, line: &str) -> Delivery {
        match self.outbound.try_send(line.to_string()) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
