use std::collections::HashMap;

use super::user_session::{ClientSession, SessionId};

/// The set of currently connected sessions. Owned by the broadcaster task,
/// so it needs no locking.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, ClientSession>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Returns false (and keeps the existing entry) if the
    /// id is already registered.
    pub fn add(&mut self, session: ClientSession) -> bool {
        if self.sessions.contains_key(&session.id) {
            return false;
        }
        self.sessions.insert(session.id, session);
        true
    }

    /// Remove a session. Removing an unknown or already-removed id is a no-op.
    pub fn remove(&mut self, id: &SessionId) -> Option<ClientSession> {
        self.sessions.remove(id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions registered at this instant.
    pub fn snapshot(&self) -> Vec<&ClientSession> {
        self.sessions.values().collect()
    }
}
