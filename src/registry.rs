//! Fixed-capacity session registry keyed by peer address

use crate::error::{Result, SessionError};
use crate::session::Session;
use crate::types::PeerAddress;
use std::sync::Arc;

/// Table of live sessions
///
/// Lookups for absent peers return a shared sentinel record instead of
/// failing; callers check the sentinel's `NotCreated` state before acting.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Vec<Arc<Session>>,
    capacity: usize,
    next_id: u32,
    sentinel: Arc<Session>,
}

impl SessionRegistry {
    /// Create an empty registry holding at most `capacity` sessions
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Vec::with_capacity(capacity),
            capacity,
            next_id: 1,
            sentinel: Arc::new(Session::sentinel()),
        }
    }

    /// Create a session for `peer`, or return the existing one
    pub fn create(&mut self, peer: PeerAddress) -> Result<Arc<Session>> {
        if let Some(existing) = self.get(&peer) {
            return Ok(existing);
        }
        if self.sessions.len() >= self.capacity {
            return Err(SessionError::RegistryFull {
                capacity: self.capacity,
            });
        }

        let session = Arc::new(Session::new(self.allocate_id(), peer));
        self.sessions.push(Arc::clone(&session));
        tracing::debug!(peer = %peer, session_id = session.id(), "Session record created");
        Ok(session)
    }

    /// Session for `peer`, or the sentinel when absent
    pub fn find(&self, peer: &PeerAddress) -> Arc<Session> {
        self.get(peer)
            .unwrap_or_else(|| Arc::clone(&self.sentinel))
    }

    /// Session for `peer`, if present
    pub fn get(&self, peer: &PeerAddress) -> Option<Arc<Session>> {
        self.sessions.iter().find(|s| s.peer() == *peer).cloned()
    }

    /// Remove a session by id
    pub fn remove(&mut self, session_id: u32) -> Option<Arc<Session>> {
        let index = self.sessions.iter().position(|s| s.id() == session_id)?;
        let removed = self.sessions.remove(index);
        tracing::debug!(
            peer = %removed.peer(),
            session_id,
            "Session record removed"
        );
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All live sessions, in insertion order
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.clone()
    }

    fn allocate_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.sessions.iter().any(|s| s.id() == id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionState;

    fn peer(n: u8) -> PeerAddress {
        PeerAddress::new([0x10, 0x20, 0x30, 0x40, 0x50, n])
    }

    #[test]
    fn test_create_and_find() {
        let mut registry = SessionRegistry::new(4);
        let session = registry.create(peer(1)).unwrap();
        assert_eq!(session.peer(), peer(1));

        let found = registry.find(&peer(1));
        assert!(Arc::ptr_eq(&found, &session));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_is_idempotent() {
        let mut registry = SessionRegistry::new(4);
        let first = registry.create(peer(1)).unwrap();
        let second = registry.create(peer(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_absent_returns_sentinel() {
        let registry = SessionRegistry::new(4);
        let found = registry.find(&peer(9));
        assert!(found.is_sentinel());
        assert_eq!(found.state(), SessionState::NotCreated);
        assert!(registry.get(&peer(9)).is_none());
    }

    #[test]
    fn test_full_registry_rejects_without_side_effects() {
        let mut registry = SessionRegistry::new(2);
        let a = registry.create(peer(1)).unwrap();
        let b = registry.create(peer(2)).unwrap();

        let err = registry.create(peer(3)).unwrap_err();
        assert!(matches!(err, SessionError::RegistryFull { capacity: 2 }));

        assert_eq!(registry.len(), 2);
        assert!(Arc::ptr_eq(&registry.find(&peer(1)), &a));
        assert!(Arc::ptr_eq(&registry.find(&peer(2)), &b));
        assert!(registry.find(&peer(3)).is_sentinel());

        // Existing peers still resolve when full
        assert!(registry.create(peer(1)).is_ok());
    }

    #[test]
    fn test_remove_by_id() {
        let mut registry = SessionRegistry::new(4);
        let a = registry.create(peer(1)).unwrap();
        registry.create(peer(2)).unwrap();

        let removed = registry.remove(a.id()).unwrap();
        assert_eq!(removed.peer(), peer(1));
        assert_eq!(registry.len(), 1);
        assert!(registry.find(&peer(1)).is_sentinel());
        assert!(registry.remove(a.id()).is_none());
    }

    #[test]
    fn test_ids_unique_among_live_sessions() {
        let mut registry = SessionRegistry::new(3);
        let a = registry.create(peer(1)).unwrap();
        let b = registry.create(peer(2)).unwrap();
        assert_ne!(a.id(), b.id());

        registry.remove(a.id());
        let c = registry.create(peer(3)).unwrap();
        assert_ne!(c.id(), b.id());
        assert_ne!(c.id(), 0);
    }

    #[test]
    fn test_id_allocation_skips_live_ids_on_wrap() {
        let mut registry = SessionRegistry::new(3);
        registry.next_id = u32::MAX;
        let a = registry.create(peer(1)).unwrap();
        assert_eq!(a.id(), u32::MAX);
        let b = registry.create(peer(2)).unwrap();
        assert_eq!(b.id(), 1);
    }
}
