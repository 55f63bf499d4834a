//! Per-peer session record
//!
//! A [`Session`] pairs the mutable [`SessionRecord`] with a transition guard.
//! The record lock is only held for short reads and writes; the transition
//! guard is held across a whole start or teardown sequence so overlapping
//! requests for the same peer serialize.

use crate::types::{DeviceType, PeerAddress, SessionState};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Mutable session fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub device_type: DeviceType,
    pub state: SessionState,
    /// Radio handle, present only while hardware resources are held
    pub handle: Option<u32>,
    /// Last negotiated configuration message (response id + config bytes)
    pub config: Vec<u8>,
    pub needs_accessory_update: bool,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: u32,
    pub peer: String,
    pub device_type: DeviceType,
    pub state: SessionState,
    pub handle: Option<u32>,
    pub config_len: usize,
    pub needs_accessory_update: bool,
}

/// A ranging session bound to one peer
#[derive(Debug)]
pub struct Session {
    id: u32,
    peer: PeerAddress,
    sentinel: bool,
    record: Mutex<SessionRecord>,
    transition: tokio::sync::Mutex<()>,
}

impl Session {
    pub(crate) fn new(id: u32, peer: PeerAddress) -> Self {
        Self {
            id,
            peer,
            sentinel: false,
            record: Mutex::new(SessionRecord::default()),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Record returned for lookups of absent peers. Always `NotCreated`.
    pub(crate) fn sentinel() -> Self {
        Self {
            sentinel: true,
            ..Self::new(0, PeerAddress::default())
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn peer(&self) -> PeerAddress {
        self.peer
    }

    /// Whether this is the registry's stand-in for an absent peer
    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    fn record(&self) -> MutexGuard<'_, SessionRecord> {
        // A panic while holding the record lock cannot leave it half-written:
        // every writer assigns whole fields.
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current record
    pub fn load(&self) -> SessionRecord {
        self.record().clone()
    }

    pub fn state(&self) -> SessionState {
        self.record().state
    }

    pub fn device_type(&self) -> DeviceType {
        self.record().device_type
    }

    pub fn handle(&self) -> Option<u32> {
        self.record().handle
    }

    pub fn needs_accessory_update(&self) -> bool {
        self.record().needs_accessory_update
    }

    /// Last negotiated configuration message
    pub fn config(&self) -> Vec<u8> {
        self.record().config.clone()
    }

    pub fn config_len(&self) -> usize {
        self.record().config.len()
    }

    /// Set the lifecycle state. Entering `NotCreated` drops the handle.
    pub(crate) fn set_state(&self, state: SessionState) {
        if self.sentinel {
            return;
        }
        let mut record = self.record();
        record.state = state;
        if state == SessionState::NotCreated {
            record.handle = None;
        }
    }

    /// Record a successful start
    pub(crate) fn mark_started(&self, handle: u32) {
        if self.sentinel {
            return;
        }
        let mut record = self.record();
        record.state = SessionState::Started;
        record.handle = Some(handle);
    }

    /// Set the device type if none has been negotiated yet.
    /// Returns the type in effect afterwards.
    pub(crate) fn negotiate_device_type(&self, device_type: DeviceType) -> DeviceType {
        if self.sentinel {
            return DeviceType::Unknown;
        }
        let mut record = self.record();
        if record.device_type == DeviceType::Unknown {
            record.device_type = device_type;
        }
        record.device_type
    }

    pub(crate) fn store_config(&self, config: Vec<u8>, needs_accessory_update: bool) {
        if self.sentinel {
            return;
        }
        let mut record = self.record();
        record.config = config;
        record.needs_accessory_update = needs_accessory_update;
    }

    /// Guard serializing hardware transitions for this session
    pub(crate) fn transition_guard(&self) -> &tokio::sync::Mutex<()> {
        &self.transition
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let record = self.record();
        SessionSnapshot {
            id: self.id,
            peer: self.peer.to_string(),
            device_type: record.device_type,
            state: record.state,
            handle: record.handle,
            config_len: record.config.len(),
            needs_accessory_update: record.needs_accessory_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerAddress {
        PeerAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01])
    }

    #[test]
    fn test_new_session_is_not_created() {
        let session = Session::new(1, peer());
        assert_eq!(session.state(), SessionState::NotCreated);
        assert_eq!(session.device_type(), DeviceType::Unknown);
        assert_eq!(session.handle(), None);
        assert!(!session.is_sentinel());
    }

    #[test]
    fn test_device_type_set_once() {
        let session = Session::new(1, peer());
        assert_eq!(session.negotiate_device_type(DeviceType::Ios), DeviceType::Ios);
        assert_eq!(
            session.negotiate_device_type(DeviceType::Android),
            DeviceType::Ios
        );
        assert_eq!(session.device_type(), DeviceType::Ios);
    }

    #[test]
    fn test_not_created_clears_handle() {
        let session = Session::new(1, peer());
        session.mark_started(0x42);
        assert_eq!(session.state(), SessionState::Started);
        assert_eq!(session.handle(), Some(0x42));

        session.set_state(SessionState::NotStarted);
        assert_eq!(session.handle(), Some(0x42));

        session.set_state(SessionState::NotCreated);
        assert_eq!(session.handle(), None);
    }

    #[test]
    fn test_sentinel_ignores_mutation() {
        let sentinel = Session::sentinel();
        sentinel.set_state(SessionState::Started);
        sentinel.mark_started(7);
        sentinel.store_config(vec![1, 2, 3], true);
        assert_eq!(sentinel.negotiate_device_type(DeviceType::Android), DeviceType::Unknown);

        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.load(), SessionRecord::default());
    }

    #[test]
    fn test_snapshot() {
        let session = Session::new(9, peer());
        session.store_config(vec![0x01, 0x10, 0x20], true);
        let snap = session.snapshot();
        assert_eq!(snap.id, 9);
        assert_eq!(snap.peer, "aa:bb:cc:dd:ee:01");
        assert_eq!(snap.config_len, 3);
        assert!(snap.needs_accessory_update);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "not_created");
        assert_eq!(json["configLen"], 3);
    }
}
