//! BLE transport abstraction
//!
//! The transport owns advertising, the connection lifecycle, and GATT
//! characteristic I/O. The session manager only sees typed [`PeerEvent`]s
//! coming in and characteristic writes going out.

use crate::types::PeerAddress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Transport initialization failed: {0}")]
    InitFailed(String),
    #[error("Advertising failed: {0}")]
    AdvertiseFailed(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Outbound characteristic the manager writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Notify characteristic carrying responses to the peer
    Tx,
    /// Readable characteristic publishing accessory configuration data
    AccessoryConfig,
}

/// Event produced by the transport's poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Connected(PeerAddress),
    Disconnected(PeerAddress),
    /// Raw bytes written by the peer to the RX characteristic
    DataReceived { peer: PeerAddress, data: Vec<u8> },
}

impl PeerEvent {
    /// Peer the event originates from
    pub fn peer(&self) -> PeerAddress {
        match self {
            Self::Connected(peer) | Self::Disconnected(peer) => *peer,
            Self::DataReceived { peer, .. } => *peer,
        }
    }
}

/// GATT layout advertised by the accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattProfile {
    /// Nearby Interaction service
    #[serde(default = "default_nearby_service")]
    pub nearby_service: String,

    /// Accessory configuration data characteristic (read)
    #[serde(default = "default_accessory_config_char")]
    pub accessory_config_char: String,

    /// UART-style configuration service (advertised)
    #[serde(default = "default_config_service")]
    pub config_service: String,

    /// RX characteristic (write / write without response)
    #[serde(default = "default_rx_char")]
    pub rx_char: String,

    /// TX characteristic (notify)
    #[serde(default = "default_tx_char")]
    pub tx_char: String,

    /// Characteristic value size in bytes
    #[serde(default = "default_char_len")]
    pub char_len: usize,
}

fn default_nearby_service() -> String {
    "48FE3E40-0817-4BB2-8633-3073689C2DBA".to_string()
}

fn default_accessory_config_char() -> String {
    "95E8D9D5-D8EF-4721-9A4E-807375F53328".to_string()
}

fn default_config_service() -> String {
    "6E400001-B5A3-F393-E0A9-E50E24DCCA9E".to_string()
}

fn default_rx_char() -> String {
    "6E400002-B5A3-F393-E0A9-E50E24DCCA9E".to_string()
}

fn default_tx_char() -> String {
    "6E400003-B5A3-F393-E0A9-E50E24DCCA9E".to_string()
}

fn default_char_len() -> usize {
    128
}

impl Default for GattProfile {
    fn default() -> Self {
        Self {
            nearby_service: default_nearby_service(),
            accessory_config_char: default_accessory_config_char(),
            config_service: default_config_service(),
            rx_char: default_rx_char(),
            tx_char: default_tx_char(),
            char_len: default_char_len(),
        }
    }
}

/// BLE peripheral transport
///
/// Implementations are driven from a single event pump: `poll()` is the
/// only place connection and write events surface.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Register services and characteristics and set the local name
    async fn begin(&self, profile: &GattProfile, device_name: &str) -> Result<(), TransportError>;

    /// Start advertising the configuration service
    async fn advertise(&self) -> Result<(), TransportError>;

    /// Drain pending connection and data events
    async fn poll(&self) -> Result<Vec<PeerEvent>, TransportError>;

    /// Write a characteristic value
    async fn write_value(&self, channel: Channel, data: &[u8]) -> Result<(), TransportError>;
}
