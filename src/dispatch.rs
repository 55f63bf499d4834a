//! Command dispatcher
//!
//! Interprets opcode-first messages written by a peer and answers over the
//! TX characteristic. Handlers run against the session resolved from the
//! originating peer; commands that would mutate a session are refused for
//! peers the registry does not know.

use crate::error::{Result, SessionError};
use crate::hooks::HookKind;
use crate::manager::SessionManager;
use crate::protocol::{self, ack, Command, ResponseId};
use crate::radio::StartRequest;
use crate::session::Session;
use crate::transport::Channel;
use crate::types::{DeviceType, PeerAddress};

impl SessionManager {
    /// Interpret one inbound message from `peer`
    pub async fn handle_message(&self, peer: PeerAddress, data: &[u8]) -> Result<()> {
        let command = Command::parse(data)?;
        let session = self.find(&peer).await;
        tracing::debug!(peer = %peer, command = ?command, "Command received");

        match command {
            Command::ConfigureAndStart { peer_config } => {
                self.configure_and_start(peer, &session, peer_config).await
            }
            Command::Initialize(device) => self.initialize(peer, &session, device).await,
            Command::Stop => self.stop(peer, &session).await,
        }
    }

    async fn configure_and_start(
        &self,
        peer: PeerAddress,
        session: &Session,
        peer_config: &[u8],
    ) -> Result<()> {
        if session.is_sentinel() {
            return Err(SessionError::UnknownPeer(peer));
        }

        let device_type = session.device_type();
        if device_type == DeviceType::Unknown {
            return Err(SessionError::UnknownDeviceType { peer });
        }

        let request = StartRequest {
            session_id: session.id(),
            device_type,
            peer_config: peer_config.to_vec(),
            params: self.config.ranging.clone(),
        };
        self.machine.start(session, request).await?;

        let written = self.write(Channel::Tx, &ack(ResponseId::DidStart)).await;
        self.hooks.notify(HookKind::SessionStart, &peer);
        written
    }

    async fn initialize(
        &self,
        peer: PeerAddress,
        session: &Session,
        requested: DeviceType,
    ) -> Result<()> {
        if session.is_sentinel() {
            return Err(SessionError::UnknownPeer(peer));
        }
        let current = session.device_type();
        if current != DeviceType::Unknown && current != requested {
            return Err(SessionError::DeviceTypeMismatch {
                peer,
                negotiated: current,
                requested,
            });
        }

        let config = self
            .machine
            .within(
                "configuration build",
                self.machine.radio().configure(session.id(), requested),
            )
            .await?
            .map_err(|status| SessionError::ConfigBuild {
                device: requested,
                reason: format!("radio returned {}", status),
            })?;
        let message =
            protocol::config_message(requested, &config.payload, self.config.max_message_len)?;

        // The radio call may have raced another initialize from the same peer
        let negotiated = session.negotiate_device_type(requested);
        if negotiated != requested {
            return Err(SessionError::DeviceTypeMismatch {
                peer,
                negotiated,
                requested,
            });
        }

        match requested {
            DeviceType::Ios => {
                session.store_config(message.clone(), config.revision.needs_accessory_update());
                if session.needs_accessory_update() {
                    tracing::info!(peer = %peer, "Following accessory protocol 1.1");
                    // The characteristic carries the configuration without the response id
                    self.write(Channel::AccessoryConfig, &message[1..]).await?;
                } else {
                    tracing::info!(peer = %peer, "Following accessory protocol 1.0");
                }
                self.write(Channel::Tx, &message).await
            }
            DeviceType::Android => {
                session.store_config(message.clone(), false);
                self.write(Channel::Tx, &message).await
            }
            DeviceType::Unknown => Err(SessionError::UnknownDeviceType { peer }),
        }
    }

    /// Stop is acknowledged even when teardown fails
    async fn stop(&self, peer: PeerAddress, session: &Session) -> Result<()> {
        tracing::info!(peer = %peer, "Received stop message");
        if let Err(e) = self.machine.teardown(session, peer).await {
            tracing::error!(peer = %peer, error = %e, "Stop session failed");
        }
        self.write(Channel::Tx, &ack(ResponseId::DidStop)).await
    }
}
