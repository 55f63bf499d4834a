//! Ranging parameter presets
//!
//! Presets carry no behavior, only data: each use case is a function that
//! fills in a flat [`RangingParams`]. Values can also be loaded from the
//! manager configuration.

use serde::{Deserialize, Serialize};

/// Short (2-byte) UWB MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; 2]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Responder,
    Initiator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangingRole {
    Controlee,
    Controller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiNodeMode {
    Unicast,
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangingMethod {
    SsTwr,
    DsTwr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledMode {
    ContentionBased,
    TimeScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfFrameConfig {
    Sp0,
    Sp1,
    Sp3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StsConfig {
    StaticSts,
    DynamicSts,
}

/// Fixed ranging session parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangingParams {
    pub session_id: u32,
    pub device_role: DeviceRole,
    pub ranging_role: RangingRole,
    pub multi_node_mode: MultiNodeMode,
    pub ranging_method: RangingMethod,
    pub scheduled_mode: ScheduledMode,
    pub device_mac: MacAddress,
    pub destination_macs: Vec<MacAddress>,
    pub frame_config: RfFrameConfig,
    pub slots_per_round: u8,
    /// Ranging round duration in milliseconds
    pub ranging_duration_ms: u32,
    pub sts_config: StsConfig,
    pub sts_segments: u8,
    pub sfd_id: u8,
    pub preamble_code_index: u8,
    pub channel: u8,
}

/// Default preamble code for multi-session anchors
pub const DEFAULT_PREAMBLE_CODE: u8 = 10;

fn base(session_id: u32, src: MacAddress, dst: MacAddress) -> RangingParams {
    RangingParams {
        session_id,
        device_role: DeviceRole::Responder,
        ranging_role: RangingRole::Controlee,
        multi_node_mode: MultiNodeMode::Unicast,
        ranging_method: RangingMethod::DsTwr,
        scheduled_mode: ScheduledMode::TimeScheduled,
        device_mac: src,
        destination_macs: vec![dst],
        frame_config: RfFrameConfig::Sp3,
        slots_per_round: 25,
        ranging_duration_ms: 200,
        sts_config: StsConfig::StaticSts,
        sts_segments: 1,
        sfd_id: 2,
        preamble_code_index: DEFAULT_PREAMBLE_CODE,
        channel: 9,
    }
}

/// Anchor tracking one tag per session
///
/// Each concurrent session needs its own session id, MAC pair, and
/// preamble code to avoid interference.
pub fn multi_session_anchor(
    session_id: u32,
    src: MacAddress,
    dst: MacAddress,
    preamble_code: u8,
) -> RangingParams {
    RangingParams {
        preamble_code_index: preamble_code,
        ..base(session_id, src, dst)
    }
}

/// Unicast initiator driving the ranging round
pub fn ranging_controller(session_id: u32, src: MacAddress, dst: MacAddress) -> RangingParams {
    RangingParams {
        device_role: DeviceRole::Initiator,
        ranging_role: RangingRole::Controller,
        ..base(session_id, src, dst)
    }
}

/// Unicast responder answering a controller
pub fn ranging_controlee(session_id: u32, src: MacAddress, dst: MacAddress) -> RangingParams {
    base(session_id, src, dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: MacAddress = MacAddress([0x11, 0x11]);
    const DST: MacAddress = MacAddress([0x22, 0x22]);

    #[test]
    fn test_multi_session_anchor() {
        let params = multi_session_anchor(0x222222, SRC, DST, 11);
        assert_eq!(params.session_id, 0x222222);
        assert_eq!(params.device_role, DeviceRole::Responder);
        assert_eq!(params.ranging_role, RangingRole::Controlee);
        assert_eq!(params.destination_macs, vec![DST]);
        assert_eq!(params.preamble_code_index, 11);
        assert_eq!(params.slots_per_round, 25);
        assert_eq!(params.ranging_duration_ms, 200);
        assert_eq!(params.channel, 9);
    }

    #[test]
    fn test_controller_and_controlee_pair() {
        let controller = ranging_controller(7, SRC, DST);
        let controlee = ranging_controlee(7, DST, SRC);
        assert_eq!(controller.ranging_role, RangingRole::Controller);
        assert_eq!(controller.device_role, DeviceRole::Initiator);
        assert_eq!(controlee.ranging_role, RangingRole::Controlee);
        assert_eq!(controller.device_mac, controlee.destination_macs[0]);
        assert_eq!(controller.preamble_code_index, controlee.preamble_code_index);
    }

    #[test]
    fn test_params_serialize() {
        let params = ranging_controlee(1, SRC, DST);
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"ranging_method\":\"ds_twr\""));
        let parsed: RangingParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, params);
    }
}
