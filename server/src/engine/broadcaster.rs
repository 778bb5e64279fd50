use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::BroadcasterClosed;

use super::events::BroadcastEvent;
use super::registry::Registry;
use super::user_session::{ClientSession, Delivery, SessionId};

/// Default capacity of the broadcaster's event stream.
pub const DEFAULT_EVENT_QUEUE: usize = 256;

/// Sole owner of the registry. Joins, leaves, counts and chat lines are
/// applied strictly in the order they were submitted.
pub struct Broadcaster {
    registry: Registry,
    events: mpsc::Receiver<BroadcastEvent>,
}

/// Cloneable submission side of the broadcaster's event stream.
#[derive(Clone, Debug)]
pub struct BroadcasterHandle {
    tx: mpsc::Sender<BroadcastEvent>,
}

/// Create a broadcaster and its handle. The broadcaster does nothing until
/// [`Broadcaster::run`] is spawned.
pub fn channel(capacity: usize) -> (Broadcaster, BroadcasterHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let broadcaster = Broadcaster {
        registry: Registry::new(),
        events: rx,
    };
    (broadcaster, BroadcasterHandle { tx })
}

impl Broadcaster {
    /// Process events until every handle has been dropped.
    pub async fn run(mut self) {
        info!("broadcaster started");
        while let Some(event) = self.events.recv().await {
            self.handle(event);
        }
        info!(remaining = self.registry.count(), "broadcaster stopped");
    }

    fn handle(&mut self, event: BroadcastEvent) {
        match event {
            BroadcastEvent::Join(session) => {
                let (id, peer) = (session.id, session.peer.clone());
                if self.registry.add(session) {
                    info!(session_id = %id, %peer, online = self.registry.count(), "client joined");
                } else {
                    warn!(session_id = %id, %peer, "ignoring join for already registered session");
                }
            }
            BroadcastEvent::Leave(id) => {
                if let Some(session) = self.registry.remove(&id) {
                    info!(
                        session_id = %id,
                        peer = %session.peer,
                        online = self.registry.count(),
                        connected_secs = session.connected_for().num_seconds(),
                        "client left"
                    );
                }
            }
            BroadcastEvent::Message(line) => {
                self.deliver(&line);
            }
            BroadcastEvent::Count(reply) => {
                // The requester may have gone away in the meantime
                let _ = reply.send(self.registry.count());
            }
        }
    }

    /// Hand `line` to every session registered right now. Sessions whose
    /// writer has gone away are removed.
    fn deliver(&mut self, line: &str) {
        let mut closed: Vec<SessionId> = Vec::new();
        let mut delivered = 0usize;

        for session in self.registry.snapshot() {
            match session.deliver(line) {
                Delivery::Queued => delivered += 1,
                Delivery::Dropped => {
                    warn!(session_id = %session.id, peer = %session.peer, "outbound queue full, dropping message");
                }
                Delivery::Closed => closed.push(session.id),
            }
        }

        for id in closed {
            if let Some(session) = self.registry.remove(&id) {
                warn!(
                    session_id = %id,
                    peer = %session.peer,
                    connected_secs = session.connected_for().num_seconds(),
                    "delivery failed, removing client"
                );
            }
        }

        debug!(delivered, "broadcast delivered");
    }
}

impl BroadcasterHandle {
    /// Register a session. No reply is sent to the session itself.
    pub async fn join(&self, session: ClientSession) -> Result<(), BroadcasterClosed> {
        self.submit(BroadcastEvent::Join(session)).await
    }

    /// Remove a session. Safe to call for a session the broadcaster already dropped.
    pub async fn leave(&self, id: SessionId) -> Result<(), BroadcasterClosed> {
        self.submit(BroadcastEvent::Leave(id)).await
    }

    /// Queue a rendered line for fan-out. Returns once the event is accepted,
    /// not once it is delivered.
    pub async fn broadcast(&self, line: String) -> Result<(), BroadcasterClosed> {
        self.submit(BroadcastEvent::Message(line)).await
    }

    /// Number of registered sessions once every earlier event has been applied.
    pub async fn count(&self) -> Result<usize, BroadcasterClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(BroadcastEvent::Count(reply_tx)).await?;
        reply_rx.await.map_err(|_| BroadcasterClosed)
    }

    async fn submit(&self, event: BroadcastEvent) -> Result<(), BroadcasterClosed> {
        self.tx.send(event).await.map_err(|_| BroadcasterClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn spawn_broadcaster() -> BroadcasterHandle {
        let (broadcaster, handle) = channel(DEFAULT_EVENT_QUEUE);
        tokio::spawn(broadcaster.run());
        handle
    }

    fn new_session(capacity: usize) -> (ClientSession, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let session = ClientSession::new(Uuid::new_v4(), "127.0.0.1:1".into(), tx);
        (session, rx)
    }

    #[tokio::test]
    async fn test_count_after_joins() {
        let handle = spawn_broadcaster();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (session, rx) = new_session(8);
            handle.join(session).await.unwrap();
            receivers.push(rx);
        }
        assert_eq!(handle.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_registered_session_once() {
        let handle = spawn_broadcaster();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (session, rx) = new_session(8);
            handle.join(session).await.unwrap();
            receivers.push(rx);
        }

        handle.broadcast("[now] Alice: hi".into()).await.unwrap();
        // Count is applied after the broadcast, so delivery has happened
        handle.count().await.unwrap();

        for rx in receivers.iter_mut() {
            assert_eq!(rx.try_recv().unwrap(), "[now] Alice: hi");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_session_joining_after_broadcast_misses_it() {
        let handle = spawn_broadcaster();
        let (early, mut early_rx) = new_session(8);
        handle.join(early).await.unwrap();
        handle.broadcast("one".into()).await.unwrap();

        let (late, mut late_rx) = new_session(8);
        handle.join(late).await.unwrap();
        handle.broadcast("two".into()).await.unwrap();
        handle.count().await.unwrap();

        assert_eq!(early_rx.try_recv().unwrap(), "one");
        assert_eq!(early_rx.try_recv().unwrap(), "two");
        assert_eq!(late_rx.try_recv().unwrap(), "two");
        assert!(late_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_stops_delivery() {
        let handle = spawn_broadcaster();
        let (a, mut a_rx) = new_session(8);
        let (b, mut b_rx) = new_session(8);
        let a_id = a.id;
        handle.join(a).await.unwrap();
        handle.join(b).await.unwrap();

        handle.leave(a_id).await.unwrap();
        handle.broadcast("after".into()).await.unwrap();
        assert_eq!(handle.count().await.unwrap(), 1);

        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap(), "after");
    }

    #[tokio::test]
    async fn test_leave_twice_is_noop() {
        let handle = spawn_broadcaster();
        let (a, _a_rx) = new_session(8);
        let a_id = a.id;
        handle.join(a).await.unwrap();

        handle.leave(a_id).await.unwrap();
        handle.leave(a_id).await.unwrap();
        handle.leave(Uuid::new_v4()).await.unwrap();
        assert_eq!(handle.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_session_removed_during_delivery() {
        let handle = spawn_broadcaster();
        let (dead, dead_rx) = new_session(8);
        let (alive, mut alive_rx) = new_session(8);
        let dead_id = dead.id;
        handle.join(dead).await.unwrap();
        handle.join(alive).await.unwrap();
        drop(dead_rx);

        handle.broadcast("ping".into()).await.unwrap();
        assert_eq!(handle.count().await.unwrap(), 1);
        assert_eq!(alive_rx.try_recv().unwrap(), "ping");

        // The handler's own leave arrives later and is harmless
        handle.leave(dead_id).await.unwrap();
        assert_eq!(handle.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_slow_session_drops_but_stays_registered() {
        let handle = spawn_broadcaster();
        let (slow, mut slow_rx) = new_session(1);
        let (fast, mut fast_rx) = new_session(8);
        handle.join(slow).await.unwrap();
        handle.join(fast).await.unwrap();

        handle.broadcast("one".into()).await.unwrap();
        handle.broadcast("two".into()).await.unwrap();
        assert_eq!(handle.count().await.unwrap(), 2);

        assert_eq!(slow_rx.try_recv().unwrap(), "one");
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(fast_rx.try_recv().unwrap(), "one");
        assert_eq!(fast_rx.try_recv().unwrap(), "two");
    }

    #[tokio::test]
    async fn test_handle_errors_once_broadcaster_is_gone() {
        let (broadcaster, handle) = channel(4);
        drop(broadcaster);
        assert_eq!(handle.broadcast("x".into()).await, Err(BroadcasterClosed));
        assert_eq!(handle.count().await, Err(BroadcasterClosed));
    }

    #[tokio::test]
    async fn test_concurrent_joins_then_broadcast() {
        let handle = spawn_broadcaster();
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let (session, rx) = new_session(8);
                handle.join(session).await.unwrap();
                rx
            }));
        }
        let mut receivers = Vec::new();
        for task in tasks {
            receivers.push(task.await.unwrap());
        }

        handle.broadcast("hello all".into()).await.unwrap();
        assert_eq!(handle.count().await.unwrap(), 20);
        for rx in receivers.iter_mut() {
            assert_eq!(rx.try_recv().unwrap(), "hello all");
            assert!(rx.try_recv().is_err());
        }
    }
}
