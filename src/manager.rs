//! Session manager: composition root for the event pump
//!
//! `SessionManager` owns the registry, the state machine, and the hooks,
//! and is the single entry point for transport events. The application
//! constructs one per device and calls [`SessionManager::poll`] from its
//! main loop.

use crate::config::ManagerConfig;
use crate::error::{Result, SessionError};
use crate::hooks::{EventHooks, HookKind};
use crate::machine::{SessionMachine, TeardownPolicy};
use crate::radio::RangingRadio;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionSnapshot};
use crate::transport::{Channel, PeerEvent, Transport};
use crate::types::PeerAddress;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Manages ranging sessions for all connected peers
pub struct SessionManager {
    pub(crate) config: ManagerConfig,
    pub(crate) machine: SessionMachine,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) hooks: Arc<EventHooks>,
    registry: RwLock<SessionRegistry>,
    advertising: AtomicBool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("device_name", &self.config.device_name)
            .field("radio", &self.machine.radio().name())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager from a radio driver and a BLE transport
    ///
    /// Fails if `config` does not pass [`ManagerConfig::validate`].
    pub fn new(
        config: ManagerConfig,
        radio: Arc<dyn RangingRadio>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let hooks = Arc::new(EventHooks::default());
        let policy = TeardownPolicy {
            timeout: config.teardown_timeout(),
            max_attempts: config.max_teardown_attempts,
        };
        Ok(Self {
            registry: RwLock::new(SessionRegistry::new(config.max_sessions)),
            machine: SessionMachine::new(radio, Arc::clone(&hooks), policy),
            transport,
            hooks,
            advertising: AtomicBool::new(false),
            config,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn hooks(&self) -> &EventHooks {
        &self.hooks
    }

    /// Called after a peer connects
    pub fn on_connect<F>(&self, hook: F)
    where
        F: Fn(&PeerAddress) + Send + Sync + 'static,
    {
        self.hooks.set(HookKind::Connect, hook);
    }

    /// Called after a peer disconnects and its session has been torn down
    pub fn on_disconnect<F>(&self, hook: F)
    where
        F: Fn(&PeerAddress) + Send + Sync + 'static,
    {
        self.hooks.set(HookKind::Disconnect, hook);
    }

    /// Called after ranging starts for a peer
    pub fn on_session_start<F>(&self, hook: F)
    where
        F: Fn(&PeerAddress) + Send + Sync + 'static,
    {
        self.hooks.set(HookKind::SessionStart, hook);
    }

    /// Called once per stop request, whether or not teardown succeeded
    pub fn on_session_stop<F>(&self, hook: F)
    where
        F: Fn(&PeerAddress) + Send + Sync + 'static,
    {
        self.hooks.set(HookKind::SessionStop, hook);
    }

    /// Register the GATT profile under the configured device name
    pub async fn begin(&self) -> Result<()> {
        self.begin_as(&self.config.device_name).await
    }

    /// Register the GATT profile under `device_name`
    pub async fn begin_as(&self, device_name: &str) -> Result<()> {
        self.transport.begin(&self.config.gatt, device_name).await?;
        tracing::info!(
            device_name,
            service = %self.config.gatt.config_service,
            "BLE peripheral configured"
        );
        Ok(())
    }

    /// Pump transport events. Starts advertising on first call.
    ///
    /// Returns the number of events handled.
    pub async fn poll(&self) -> Result<usize> {
        if !self.advertising.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.transport.advertise().await {
                self.advertising.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
            tracing::info!("Advertising started");
        }

        let events = self.transport.poll().await?;
        let count = events.len();
        for event in events {
            self.handle_event(event).await;
        }
        Ok(count)
    }

    /// Handle one transport event
    ///
    /// Protocol errors are logged and the message dropped; nothing here
    /// propagates to the pump.
    pub async fn handle_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::Connected(peer) => self.peer_connected(peer).await,
            PeerEvent::Disconnected(peer) => self.peer_disconnected(peer).await,
            PeerEvent::DataReceived { peer, data } => {
                if let Err(e) = self.handle_message(peer, &data).await {
                    tracing::warn!(peer = %peer, error = %e, "Command dropped");
                }
            }
        }
    }

    async fn peer_connected(&self, peer: PeerAddress) {
        let created = self.registry.write().await.create(peer);
        match created {
            Ok(session) => {
                tracing::info!(peer = %peer, session_id = session.id(), "Peer connected");
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Peer connected without a session");
            }
        }
        self.hooks.notify(HookKind::Connect, &peer);
    }

    async fn peer_disconnected(&self, peer: PeerAddress) {
        let session = self.find(&peer).await;

        // Release hardware before dropping the bookkeeping for it
        if let Err(e) = self.machine.teardown(&session, peer).await {
            tracing::warn!(peer = %peer, error = %e, "Teardown on disconnect failed");
        }
        if !session.is_sentinel() {
            self.registry.write().await.remove(session.id());
        }

        tracing::info!(peer = %peer, "Peer disconnected");
        self.hooks.notify(HookKind::Disconnect, &peer);
    }

    /// Session for `peer`, or the sentinel record when absent
    pub async fn find(&self, peer: &PeerAddress) -> Arc<Session> {
        self.registry.read().await.find(peer)
    }

    /// Session for `peer`, if present
    pub async fn session(&self, peer: &PeerAddress) -> Option<Arc<Session>> {
        self.registry.read().await.get(peer)
    }

    pub async fn session_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Stop and release the session for `peer`
    pub async fn stop_session(&self, peer: &PeerAddress) -> Result<()> {
        let session = self.find(peer).await;
        self.machine.teardown(&session, *peer).await
    }

    /// Point-in-time view of all live sessions
    pub async fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.registry
            .read()
            .await
            .sessions()
            .iter()
            .map(|s| s.snapshot())
            .collect()
    }

    pub(crate) async fn write(&self, channel: Channel, data: &[u8]) -> Result<()> {
        if data.len() > self.config.max_message_len {
            return Err(SessionError::Transport(
                crate::transport::TransportError::PayloadTooLarge {
                    len: data.len(),
                    max: self.config.max_message_len,
                },
            ));
        }
        self.transport.write_value(channel, data).await?;
        tracing::debug!(channel = ?channel, len = data.len(), "Characteristic written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRadio, MockTransport, RadioCall};
    use crate::types::SessionState;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn peer(n: u8) -> PeerAddress {
        PeerAddress::new([0xc0, 0xff, 0xee, 0x00, 0x00, n])
    }

    fn setup(config: ManagerConfig) -> (SessionManager, Arc<MockRadio>, Arc<MockTransport>) {
        let radio = Arc::new(MockRadio::new());
        let transport = Arc::new(MockTransport::new());
        let manager = SessionManager::new(config, radio.clone(), transport.clone()).unwrap();
        (manager, radio, transport)
    }

    #[tokio::test]
    async fn test_begin_registers_profile() {
        let (manager, _, transport) = setup(ManagerConfig::default());
        manager.begin().await.unwrap();
        let (profile, name) = transport.begun().unwrap();
        assert_eq!(name, "UWB Accessory");
        assert_eq!(profile, manager.config().gatt);

        manager.begin_as("Anchor-7").await.unwrap();
        assert_eq!(transport.begun().unwrap().1, "Anchor-7");
    }

    #[tokio::test]
    async fn test_poll_advertises_once() {
        let (manager, _, transport) = setup(ManagerConfig::default());
        assert_eq!(manager.poll().await.unwrap(), 0);
        assert_eq!(manager.poll().await.unwrap(), 0);
        assert_eq!(transport.advertise_count(), 1);
    }

    #[tokio::test]
    async fn test_poll_dispatches_events() {
        let (manager, _, transport) = setup(ManagerConfig::default());
        transport.push_event(PeerEvent::Connected(peer(1)));
        transport.push_event(PeerEvent::Connected(peer(2)));

        assert_eq!(manager.poll().await.unwrap(), 2);
        assert_eq!(manager.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_connect_creates_record_and_notifies() {
        let (manager, _, _) = setup(ManagerConfig::default());
        let connects = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&connects);
        manager.on_connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        manager.handle_event(PeerEvent::Connected(peer(1))).await;
        manager.handle_event(PeerEvent::Connected(peer(1))).await;

        assert_eq!(manager.session_count().await, 1);
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        let session = manager.session(&peer(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::NotCreated);
    }

    #[tokio::test]
    async fn test_connect_beyond_capacity() {
        let config = ManagerConfig {
            max_sessions: 1,
            ..ManagerConfig::default()
        };
        let (manager, _, _) = setup(config);
        manager.handle_event(PeerEvent::Connected(peer(1))).await;
        let first = manager.session(&peer(1)).await.unwrap();

        manager.handle_event(PeerEvent::Connected(peer(2))).await;

        assert_eq!(manager.session_count().await, 1);
        assert!(manager.session(&peer(2)).await.is_none());
        assert!(Arc::ptr_eq(&manager.find(&peer(1)).await, &first));
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_before_removal() {
        let (manager, radio, _) = setup(ManagerConfig::default());
        manager.handle_event(PeerEvent::Connected(peer(1))).await;
        let session = manager.session(&peer(1)).await.unwrap();
        session.mark_started(0x10);

        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        manager.on_session_stop(move |_| o.lock().unwrap().push("stop"));
        let o = Arc::clone(&order);
        manager.on_disconnect(move |_| o.lock().unwrap().push("disconnect"));

        manager.handle_event(PeerEvent::Disconnected(peer(1))).await;

        assert_eq!(*order.lock().unwrap(), vec!["stop", "disconnect"]);
        assert_eq!(session.state(), SessionState::NotCreated);
        assert!(manager.session(&peer(1)).await.is_none());
        assert_eq!(radio.count(|c| matches!(c, RadioCall::Deinit(_))), 1);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_peer() {
        let (manager, radio, _) = setup(ManagerConfig::default());
        let stops = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&stops);
        manager.on_session_stop(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        manager.handle_event(PeerEvent::Disconnected(peer(4))).await;

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(radio.calls().is_empty());
    }

    #[tokio::test]
    async fn test_peer_beyond_capacity_keeps_its_address_in_hooks() {
        let config = ManagerConfig {
            max_sessions: 1,
            ..ManagerConfig::default()
        };
        let (manager, radio, _) = setup(config);
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        manager.on_session_stop(move |p| o.lock().unwrap().push(format!("stop {}", p)));
        let o = Arc::clone(&order);
        manager.on_disconnect(move |p| o.lock().unwrap().push(format!("disconnect {}", p)));

        manager.handle_event(PeerEvent::Connected(peer(1))).await;
        manager.handle_event(PeerEvent::Connected(peer(2))).await;
        manager
            .handle_event(PeerEvent::DataReceived {
                peer: peer(2),
                data: vec![0x0C],
            })
            .await;
        manager.handle_event(PeerEvent::Disconnected(peer(2))).await;

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "stop c0:ff:ee:00:00:02",
                "stop c0:ff:ee:00:00:02",
                "disconnect c0:ff:ee:00:00:02"
            ]
        );
        assert!(radio.calls().is_empty());
        assert_eq!(manager.session_count().await, 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ManagerConfig {
            max_teardown_attempts: 0,
            ..ManagerConfig::default()
        };
        let err = SessionManager::new(
            config,
            Arc::new(MockRadio::new()),
            Arc::new(MockTransport::new()),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (manager, _, _) = setup(ManagerConfig::default());
        manager.handle_event(PeerEvent::Connected(peer(1))).await;
        manager.handle_event(PeerEvent::Connected(peer(2))).await;

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].peer, "c0:ff:ee:00:00:01");
        assert_eq!(snapshot[1].state, SessionState::NotCreated);
    }

    #[tokio::test]
    async fn test_write_rejects_oversized_payload() {
        let config = ManagerConfig {
            max_message_len: 4,
            ..ManagerConfig::default()
        };
        let (manager, _, transport) = setup(config);
        let err = manager.write(Channel::Tx, &[0u8; 5]).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
        assert!(transport.writes().is_empty());
    }
}
