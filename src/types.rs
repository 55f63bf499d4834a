//! Core session types shared by the registry, state machine, and dispatcher
//!
//! Status codes follow the UCI numbering used by the ranging radio so that
//! driver return values can be carried through without translation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport-layer address of a connected peer
///
/// Stable for the life of a BLE connection. Displayed in the usual
/// colon-separated form (`aa:bb:cc:dd:ee:ff`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    /// Create an address from its raw bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for PeerAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| format!("Address too short: {}", s))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|e| format!("Invalid address octet '{}': {}", part, e))?;
        }
        if parts.next().is_some() {
            return Err(format!("Address too long: {}", s));
        }
        Ok(Self(bytes))
    }
}

/// Peer platform, negotiated by the first configuration message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// No configuration message seen yet
    #[default]
    Unknown,
    /// Accessory-protocol flavor (Nearby Interaction)
    Ios,
    /// Single-channel relay flavor
    Android,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Ios => write!(f, "ios"),
            Self::Android => write!(f, "android"),
        }
    }
}

/// Lifecycle state of a ranging session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No hardware resources held
    #[default]
    NotCreated,
    /// Session object exists in the radio, ranging inactive
    NotStarted,
    /// Ranging active
    Started,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCreated => write!(f, "not_created"),
            Self::NotStarted => write!(f, "not_started"),
            Self::Started => write!(f, "started"),
        }
    }
}

/// Status returned by the ranging radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioStatus {
    Success,
    Rejected,
    Failed,
    SyntaxError,
    InvalidParam,
    InvalidRange,
    InvalidMessageSize,
    CommandRetry,
    SessionNotExist,
    SessionDuplicate,
    SessionActive,
    MaxSessionsExceeded,
    SessionNotConfigured,
    Unknown(u8),
}

impl RadioStatus {
    /// Whether the status means the requested state has been reached
    ///
    /// A session that no longer exists has already reached any
    /// teardown target, so it counts the same as success.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Success | Self::SessionNotExist)
    }

    /// UCI status code
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::Rejected => 0x01,
            Self::Failed => 0x02,
            Self::SyntaxError => 0x03,
            Self::InvalidParam => 0x04,
            Self::InvalidRange => 0x05,
            Self::InvalidMessageSize => 0x06,
            Self::CommandRetry => 0x0A,
            Self::SessionNotExist => 0x11,
            Self::SessionDuplicate => 0x12,
            Self::SessionActive => 0x13,
            Self::MaxSessionsExceeded => 0x14,
            Self::SessionNotConfigured => 0x15,
            Self::Unknown(code) => code,
        }
    }
}

impl From<u8> for RadioStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Success,
            0x01 => Self::Rejected,
            0x02 => Self::Failed,
            0x03 => Self::SyntaxError,
            0x04 => Self::InvalidParam,
            0x05 => Self::InvalidRange,
            0x06 => Self::InvalidMessageSize,
            0x0A => Self::CommandRetry,
            0x11 => Self::SessionNotExist,
            0x12 => Self::SessionDuplicate,
            0x13 => Self::SessionActive,
            0x14 => Self::MaxSessionsExceeded,
            0x15 => Self::SessionNotConfigured,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for RadioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown(0x{:02x})", code),
            other => write!(f, "{:?}(0x{:02x})", other, other.code()),
        }
    }
}

/// Revision of the accessory configuration protocol
///
/// Revision 1.1 additionally publishes the configuration on a dedicated
/// GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ProtocolRevision {
    #[default]
    V1_0,
    V1_1,
}

impl ProtocolRevision {
    /// Whether this revision expects the accessory config characteristic update
    pub fn needs_accessory_update(self) -> bool {
        self >= Self::V1_1
    }
}
