//! Error types for uwb-nearby

use crate::transport::TransportError;
use crate::types::{DeviceType, PeerAddress, RadioStatus};
use thiserror::Error;

/// Why a teardown sequence gave up before reaching `NotCreated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TeardownAbort {
    /// Elapsed-time budget exceeded
    #[error("timed out")]
    Timeout,

    /// Attempt counter exceeded
    #[error("too many attempts")]
    AttemptsExhausted,

    /// A transition returned a status other than success or "already gone"
    #[error("radio returned {0}")]
    Radio(RadioStatus),
}

/// Errors that can occur while managing ranging sessions
#[derive(Debug, Error)]
pub enum SessionError {
    /// Stop/deinit did not complete; recovery reset has been applied
    #[error("Teardown of session for {peer} failed: {reason}")]
    Teardown {
        peer: PeerAddress,
        reason: TeardownAbort,
    },

    /// Platform start rejected by the radio
    #[error("Failed to start session for {peer}: radio returned {status}")]
    Start {
        peer: PeerAddress,
        status: RadioStatus,
    },

    /// Configuration payload could not be built
    #[error("Failed to build {device} configuration: {reason}")]
    ConfigBuild {
        device: DeviceType,
        reason: String,
    },

    /// Inbound message carried no bytes
    #[error("Empty command payload")]
    EmptyPayload,

    /// Inbound opcode not part of the protocol
    #[error("Unknown command opcode: 0x{0:02x}")]
    UnknownOpcode(u8),

    /// Start requested before the peer platform was negotiated
    #[error("Unknown device type for {peer}")]
    UnknownDeviceType { peer: PeerAddress },

    /// Initialize for a platform other than the one already negotiated
    #[error("Peer {peer} negotiated {negotiated}, refusing {requested} initialize")]
    DeviceTypeMismatch {
        peer: PeerAddress,
        negotiated: DeviceType,
        requested: DeviceType,
    },

    /// Command addressed to a peer with no session record
    #[error("No session for peer {0}")]
    UnknownPeer(PeerAddress),

    /// Start requested while ranging is already active
    #[error("Session for {peer} already started")]
    AlreadyStarted { peer: PeerAddress },

    /// Registry at capacity
    #[error("Session registry full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    /// Radio call or guard acquisition exceeded its budget
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Transport write or poll failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML deserialization failure
    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
