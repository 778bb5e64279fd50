use tokio::sync::oneshot;

use super::user_session::{ClientSession, SessionId};

/// Everything that touches the registry flows through the broadcaster as one of
/// these, in submission order.
#[derive(Debug)]
pub enum BroadcastEvent {
    /// A connection finished registering.
    Join(ClientSession),
    /// A connection handler saw its peer go away.
    Leave(SessionId),
    /// A rendered chat line to fan out to every registered session.
    Message(String),
    /// Point-in-time query for the number of registered sessions.
    Count(oneshot::Sender<usize>),
}
