use std::sync::Arc;

use crate::config::RelayConfig;
use crate::engine::broadcaster::{self, Broadcaster, BroadcasterHandle};
use crate::history::HistoryStore;

/// Shared context handed to every connection handler. Built once at startup.
#[derive(Clone, Debug)]
pub struct RelayState {
    pub broadcaster: BroadcasterHandle,
    pub history: Arc<HistoryStore>,
    /// Capacity of each session's broadcast delivery queue.
    pub outbound_queue: usize,
    /// Capacity of each session's direct reply queue.
    pub reply_queue: usize,
}

impl RelayState {
    /// Build the relay context and the broadcaster that backs it. The caller
    /// spawns [`Broadcaster::run`]; it stops once every clone of this state
    /// has been dropped.
    pub fn new(config: &RelayConfig) -> (Self, Broadcaster) {
        let (broadcaster, handle) = broadcaster::channel(config.broadcast.event_queue);
        let state = Self {
            broadcaster: handle,
            history: Arc::new(HistoryStore::new(config.history.path.clone())),
            outbound_queue: config.broadcast.outbound_queue.max(1),
            reply_queue: config.broadcast.reply_queue.max(1),
        };
        (state, broadcaster)
    }
}
