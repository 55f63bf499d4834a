//! Command protocol wire format
//!
//! Every message is opcode-first. Inbound commands:
//!
//! | Opcode | Value | Body |
//! |---|---|---|
//! | `InitializeIos` | `0x0A` | ignored |
//! | `ConfigureAndStart` | `0x0B` | shareable configuration from the peer |
//! | `Stop` | `0x0C` | ignored |
//! | `InitializeAndroid` | `0xA5` | ignored |
//!
//! Outbound messages start with a response id: `0x01` configuration data,
//! `0x02` did-start, `0x03` did-stop.

use crate::error::{Result, SessionError};
use crate::types::DeviceType;

/// Inbound command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    InitializeIos = 0x0A,
    ConfigureAndStart = 0x0B,
    Stop = 0x0C,
    InitializeAndroid = 0xA5,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x0A => Some(Self::InitializeIos),
            0x0B => Some(Self::ConfigureAndStart),
            0x0C => Some(Self::Stop),
            0xA5 => Some(Self::InitializeAndroid),
            _ => None,
        }
    }
}

/// Outbound response ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseId {
    AccessoryConfigData = 0x01,
    DidStart = 0x02,
    DidStop = 0x03,
}

/// Parsed inbound command borrowing from the raw message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Build configuration for the given platform flavor
    Initialize(DeviceType),
    /// Start ranging with the peer's shareable configuration
    ConfigureAndStart { peer_config: &'a [u8] },
    Stop,
}

impl<'a> Command<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let (&opcode, body) = data.split_first().ok_or(SessionError::EmptyPayload)?;
        match Opcode::from_byte(opcode) {
            Some(Opcode::InitializeIos) => Ok(Self::Initialize(DeviceType::Ios)),
            Some(Opcode::InitializeAndroid) => Ok(Self::Initialize(DeviceType::Android)),
            Some(Opcode::ConfigureAndStart) => Ok(Self::ConfigureAndStart { peer_config: body }),
            Some(Opcode::Stop) => Ok(Self::Stop),
            None => Err(SessionError::UnknownOpcode(opcode)),
        }
    }
}

/// Single-byte acknowledgement
pub fn ack(id: ResponseId) -> [u8; 1] {
    [id as u8]
}

/// Frame radio configuration bytes as a configuration-data message
///
/// Fails when the framed message would not fit `max_len`.
pub fn config_message(device: DeviceType, payload: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let len = payload.len() + 1;
    if payload.is_empty() {
        return Err(SessionError::ConfigBuild {
            device,
            reason: "radio returned empty configuration".to_string(),
        });
    }
    if len > max_len {
        return Err(SessionError::ConfigBuild {
            device,
            reason: format!("message too large: {} bytes (max {})", len, max_len),
        });
    }
    let mut buf = Vec::with_capacity(len);
    buf.push(ResponseId::AccessoryConfigData as u8);
    buf.extend_from_slice(payload);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse(&[0x0A]).unwrap(),
            Command::Initialize(DeviceType::Ios)
        );
        assert_eq!(
            Command::parse(&[0xA5, 0xff]).unwrap(),
            Command::Initialize(DeviceType::Android)
        );
        assert_eq!(Command::parse(&[0x0C]).unwrap(), Command::Stop);
        assert_eq!(
            Command::parse(&[0x0B, 1, 2, 3]).unwrap(),
            Command::ConfigureAndStart {
                peer_config: &[1, 2, 3]
            }
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            Command::parse(&[]),
            Err(SessionError::EmptyPayload)
        ));
    }

    #[test]
    fn test_parse_unknown_opcode() {
        assert!(matches!(
            Command::parse(&[0x7f, 0x00]),
            Err(SessionError::UnknownOpcode(0x7f))
        ));
    }

    #[test]
    fn test_ack_bytes() {
        assert_eq!(ack(ResponseId::DidStart), [0x02]);
        assert_eq!(ack(ResponseId::DidStop), [0x03]);
    }

    #[test]
    fn test_config_message_prefix() {
        let msg = config_message(DeviceType::Ios, &[0xaa, 0xbb], 128).unwrap();
        assert_eq!(msg, vec![0x01, 0xaa, 0xbb]);
    }

    #[test]
    fn test_config_message_limits() {
        assert!(config_message(DeviceType::Android, &[0u8; 127], 128).is_ok());
        let err = config_message(DeviceType::Android, &[0u8; 128], 128).unwrap_err();
        assert!(matches!(err, SessionError::ConfigBuild { device: DeviceType::Android, .. }));
        assert!(config_message(DeviceType::Ios, &[], 128).is_err());
    }
}
