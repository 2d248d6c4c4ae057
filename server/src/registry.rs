//! Registry of live sessions and broadcast fan-out
//!
//! The registry is the single owner of the live-session set. The server keeps
//! it behind one `tokio::sync::Mutex`, so inserts, removals and broadcast
//! traversals are mutually exclusive. Broadcast holds that lock for its whole
//! traversal; a slow peer delays membership changes until its send completes
//! or fails.

use crate::logging::Logger;
use crate::session::{Session, SessionId};
use std::collections::HashMap;
use std::sync::Arc;

/// Manages all connected sessions, keyed by their stable id
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Arc<Session>>,
    log: Arc<dyn Logger>,
}

impl SessionRegistry {
    /// Creates an empty registry logging membership changes to `log`
    pub fn new(log: Arc<dyn Logger>) -> Self {
        Self {
            sessions: HashMap::new(),
            log,
        }
    }

    /// Registers a freshly accepted session.
    ///
    /// Returns false for sessions that are already disconnected or whose id is
    /// taken; a session is never re-added after it goes away.
    pub fn insert(&mut self, session: Arc<Session>) -> bool {
        if !session.is_connected() || self.sessions.contains_key(&session.id()) {
            return false;
        }

        self.log.info(format_args!(
            "Session {} registered for {}",
            session.id(),
            session.peer()
        ));
        self.sessions.insert(session.id(), session);
        true
    }

    /// Unregisters a session, returning it if it was present.
    ///
    /// The session is not disconnected here; its handler does that before
    /// removing it, and `disconnect_all` does both for shutdown.
    pub fn remove(&mut self, id: SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(&id);
        if let Some(session) = &removed {
            self.log.info(format_args!(
                "Session {} removed ({} remaining)",
                session.id(),
                self.sessions.len()
            ));
        }
        removed
    }

    /// Shared handle to a registered session
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).cloned()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sends `payload` to every connected session except `exclude`.
    ///
    /// A failed send only affects the session it was meant for (which
    /// disconnects itself); delivery to the others continues. Returns the
    /// number of sessions the frame was delivered to.
    pub async fn broadcast(&self, payload: &[u8], exclude: Option<SessionId>) -> usize {
        let mut delivered = 0;

        for (id, session) in &self.sessions {
            if Some(*id) == exclude || !session.is_connected() {
                continue;
            }

            if session.send_frame(payload).await {
                delivered += 1;
            } else {
                self.log
                    .warning(format_args!("Broadcast to session {} failed", id));
            }
        }

        self.log.debug(format_args!(
            "Broadcast {} bytes to {} session(s)",
            payload.len(),
            delivered
        ));
        delivered
    }

    /// Disconnects and removes every session, returning how many there were
    pub fn disconnect_all(&mut self) -> usize {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.disconnect();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use crate::session::tests::session_pair;
    use protocol::read_frame;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    fn test_log() -> Arc<dyn Logger> {
        Arc::new(MemoryLogger::new())
    }

    async fn expect_frame(stream: &mut TcpStream) -> Vec<u8> {
        timeout(Duration::from_secs(5), read_frame(stream))
            .await
            .expect("timed out waiting for frame")
            .unwrap()
    }

    async fn expect_silence(stream: &mut TcpStream) {
        let result = timeout(Duration::from_millis(100), read_frame(stream)).await;
        assert!(result.is_err(), "expected no frame, got {:?}", result);
    }

    #[tokio::test]
    async fn test_registry_creation() {
        let registry = SessionRegistry::new(test_log());
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let mut registry = SessionRegistry::new(test_log());
        let (session, _client) = session_pair(1, test_log()).await;

        assert!(registry.insert(Arc::clone(&session)));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(SessionId(1)).is_some());

        let removed = registry.remove(SessionId(1)).unwrap();
        assert_eq!(removed.id(), SessionId(1));
        assert!(registry.is_empty());
        assert!(registry.remove(SessionId(1)).is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let mut registry = SessionRegistry::new(test_log());
        let (first, _c1) = session_pair(1, test_log()).await;
        let (second, _c2) = session_pair(1, test_log()).await;

        assert!(registry.insert(first));
        assert!(!registry.insert(second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_disconnected_session() {
        let mut registry = SessionRegistry::new(test_log());
        let (session, _client) = session_pair(1, test_log()).await;

        session.disconnect();
        assert!(!registry.insert(session));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_session() {
        let mut registry = SessionRegistry::new(test_log());
        let (a, mut client_a) = session_pair(1, test_log()).await;
        let (b, mut client_b) = session_pair(2, test_log()).await;
        let (c, mut client_c) = session_pair(3, test_log()).await;
        registry.insert(a);
        registry.insert(b);
        registry.insert(c);

        let delivered = registry.broadcast(b"update", Some(SessionId(1))).await;
        assert_eq!(delivered, 2);

        assert_eq!(expect_frame(&mut client_b).await, b"update".to_vec());
        assert_eq!(expect_frame(&mut client_c).await, b"update".to_vec());
        expect_silence(&mut client_a).await;
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        let mut registry = SessionRegistry::new(test_log());
        let (a, mut client_a) = session_pair(1, test_log()).await;
        let (b, mut client_b) = session_pair(2, test_log()).await;
        registry.insert(a);
        registry.insert(b);

        assert_eq!(registry.broadcast(b"all", None).await, 2);
        assert_eq!(expect_frame(&mut client_a).await, b"all".to_vec());
        assert_eq!(expect_frame(&mut client_b).await, b"all".to_vec());
    }

    #[tokio::test]
    async fn test_broadcast_continues_past_disconnected_member() {
        let mut registry = SessionRegistry::new(test_log());
        let (a, _client_a) = session_pair(1, test_log()).await;
        let (b, mut client_b) = session_pair(2, test_log()).await;
        registry.insert(Arc::clone(&a));
        registry.insert(b);

        a.disconnect();

        assert_eq!(registry.broadcast(b"still here", None).await, 1);
        assert_eq!(expect_frame(&mut client_b).await, b"still here".to_vec());
    }

    #[tokio::test]
    async fn test_disconnect_all() {
        let mut registry = SessionRegistry::new(test_log());
        let (a, _client_a) = session_pair(1, test_log()).await;
        let (b, _client_b) = session_pair(2, test_log()).await;
        registry.insert(Arc::clone(&a));
        registry.insert(Arc::clone(&b));

        assert_eq!(registry.disconnect_all(), 2);
        assert!(registry.is_empty());
        assert!(!a.is_connected());
        assert!(!b.is_connected());
        assert!(!a.send_frame(b"gone").await);
        assert_eq!(registry.broadcast(b"nobody", None).await, 0);
    }
}
