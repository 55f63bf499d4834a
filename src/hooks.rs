//! Application event hooks
//!
//! One optional callback per [`HookKind`]. Registering again replaces the
//! previous callback. Hooks run on the event pump and receive the peer they
//! concern.

use crate::types::PeerAddress;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Callback invoked with the peer an event concerns
pub type PeerHook = Arc<dyn Fn(&PeerAddress) + Send + Sync>;

/// Notification points exposed to the embedding application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Connect,
    Disconnect,
    SessionStart,
    SessionStop,
}

#[derive(Default)]
pub struct EventHooks {
    connect: RwLock<Option<PeerHook>>,
    disconnect: RwLock<Option<PeerHook>>,
    session_start: RwLock<Option<PeerHook>>,
    session_stop: RwLock<Option<PeerHook>>,
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("connect", &self.is_set(HookKind::Connect))
            .field("disconnect", &self.is_set(HookKind::Disconnect))
            .field("session_start", &self.is_set(HookKind::SessionStart))
            .field("session_stop", &self.is_set(HookKind::SessionStop))
            .finish()
    }
}

impl EventHooks {
    fn slot(&self, kind: HookKind) -> &RwLock<Option<PeerHook>> {
        match kind {
            HookKind::Connect => &self.connect,
            HookKind::Disconnect => &self.disconnect,
            HookKind::SessionStart => &self.session_start,
            HookKind::SessionStop => &self.session_stop,
        }
    }

    /// Register (or replace) the callback for `kind`
    pub fn set<F>(&self, kind: HookKind, hook: F)
    where
        F: Fn(&PeerAddress) + Send + Sync + 'static,
    {
        let mut slot = self.slot(kind).write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(hook));
    }

    /// Remove the callback for `kind`
    pub fn clear(&self, kind: HookKind) {
        let mut slot = self.slot(kind).write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_set(&self, kind: HookKind) -> bool {
        self.slot(kind)
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Invoke the callback for `kind`, if any
    pub fn notify(&self, kind: HookKind, peer: &PeerAddress) {
        // Clone out so a hook may re-register hooks without deadlocking.
        let hook = self
            .slot(kind)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(hook) = hook {
            tracing::trace!(peer = %peer, hook = ?kind, "Invoking hook");
            hook(peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_without_hook_is_noop() {
        let hooks = EventHooks::default();
        hooks.notify(HookKind::Connect, &PeerAddress::default());
        assert!(!hooks.is_set(HookKind::Connect));
    }

    #[test]
    fn test_hooks_are_independent() {
        let hooks = EventHooks::default();
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&starts);
        hooks.set(HookKind::SessionStart, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&stops);
        hooks.set(HookKind::SessionStop, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        let peer = PeerAddress::new([1, 2, 3, 4, 5, 6]);
        hooks.notify(HookKind::SessionStop, &peer);
        hooks.notify(HookKind::SessionStop, &peer);
        hooks.notify(HookKind::SessionStart, &peer);

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_replaces_and_clear_removes() {
        let hooks = EventHooks::default();
        let seen = Arc::new(RwLock::new(Vec::new()));

        let s = Arc::clone(&seen);
        hooks.set(HookKind::Connect, move |_| s.write().unwrap().push("first"));
        let s = Arc::clone(&seen);
        hooks.set(HookKind::Connect, move |_| s.write().unwrap().push("second"));

        hooks.notify(HookKind::Connect, &PeerAddress::default());
        hooks.clear(HookKind::Connect);
        hooks.notify(HookKind::Connect, &PeerAddress::default());

        assert_eq!(*seen.read().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_hook_receives_peer() {
        let hooks = EventHooks::default();
        let seen = Arc::new(RwLock::new(None));
        let s = Arc::clone(&seen);
        hooks.set(HookKind::Disconnect, move |peer| *s.write().unwrap() = Some(*peer));

        let peer = PeerAddress::new([9, 8, 7, 6, 5, 4]);
        hooks.notify(HookKind::Disconnect, &peer);
        assert_eq!(*seen.read().unwrap(), Some(peer));
    }
}
