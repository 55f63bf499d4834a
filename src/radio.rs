//! Ranging radio trait: the hardware boundary
//!
//! The radio driver owns session creation, ranging, and reset. The state
//! machine only cares whether each call reached the requested state, which
//! [`RadioStatus::is_settled`] answers.

use crate::presets::RangingParams;
use crate::types::{DeviceType, ProtocolRevision, RadioStatus};
use async_trait::async_trait;

/// Shareable configuration produced by the radio for a peer platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigData {
    /// Configuration bytes, without the response-id prefix
    pub payload: Vec<u8>,

    /// Accessory protocol revision the payload follows
    pub revision: ProtocolRevision,
}

impl ConfigData {
    /// Configuration following revision 1.0
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            revision: ProtocolRevision::V1_0,
        }
    }

    /// Set the protocol revision
    pub fn with_revision(mut self, revision: ProtocolRevision) -> Self {
        self.revision = revision;
        self
    }
}

/// Parameters for a platform start
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    /// Session identifier allocated by the registry
    pub session_id: u32,

    /// Negotiated peer platform
    pub device_type: DeviceType,

    /// Configuration bytes sent by the peer (opcode stripped)
    pub peer_config: Vec<u8>,

    /// Optional fixed ranging parameters
    pub params: Option<RangingParams>,
}

/// Ranging radio driver
#[async_trait]
pub trait RangingRadio: Send + Sync {
    /// Build the configuration the peer needs to join a session
    async fn configure(
        &self,
        session_id: u32,
        device_type: DeviceType,
    ) -> Result<ConfigData, RadioStatus>;

    /// Create and start a session, returning the radio's session handle
    async fn start(&self, request: &StartRequest) -> Result<u32, RadioStatus>;

    /// Stop ranging
    async fn stop(&self, session_id: u32) -> RadioStatus;

    /// Release the session object
    async fn deinit(&self, session_id: u32) -> RadioStatus;

    /// Full subsystem reset
    async fn reset(&self) -> RadioStatus;

    /// Driver name for logs
    fn name(&self) -> &str {
        "radio"
    }
}
