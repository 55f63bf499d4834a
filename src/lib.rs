//! # uwb-nearby
//!
//! Ranging session management for UWB accessories paired with phones over BLE.
//!
//! ## Overview
//!
//! `uwb-nearby` turns the small opcode-first command protocol spoken by
//! Nearby-style phone apps into ranging session operations on a UWB radio.
//! Each connected peer gets a session record; commands configure, start, and
//! stop ranging; disconnects tear sessions down before the record is dropped.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use uwb_nearby::mock::{MockRadio, MockTransport};
//! use uwb_nearby::{ManagerConfig, SessionManager};
//!
//! # async fn example() -> uwb_nearby::Result<()> {
//! let manager = SessionManager::new(
//!     ManagerConfig::default(),
//!     Arc::new(MockRadio::new()),
//!     Arc::new(MockTransport::new()),
//! )?;
//!
//! manager.on_session_start(|peer| println!("Ranging with {}", peer));
//! manager.begin().await?;
//!
//! // Main loop
//! manager.poll().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **RangingRadio** trait: start/stop/deinit/reset on the UWB subsystem
//! - **Transport** trait: BLE peripheral producing typed `PeerEvent`s
//! - **SessionManager**: single entry point owning registry, state machine, hooks
//! - **SessionMachine**: bounded teardown with reset recovery
//! - **presets**: flat ranging parameter values per use case

pub mod config;
mod dispatch;
pub mod error;
pub mod hooks;
pub mod machine;
pub mod manager;
pub mod mock;
pub mod presets;
pub mod protocol;
pub mod radio;
pub mod registry;
pub mod session;
pub mod transport;
pub mod types;

// Re-export core types
pub use config::ManagerConfig;
pub use error::{Result, SessionError, TeardownAbort};
pub use hooks::{EventHooks, HookKind};
pub use machine::{SessionMachine, TeardownPolicy};
pub use manager::SessionManager;
pub use presets::RangingParams;
pub use protocol::{Command, Opcode, ResponseId};
pub use radio::{ConfigData, RangingRadio, StartRequest};
pub use registry::SessionRegistry;
pub use session::{Session, SessionRecord, SessionSnapshot};
pub use transport::{Channel, GattProfile, PeerEvent, Transport, TransportError};
pub use types::{DeviceType, PeerAddress, ProtocolRevision, RadioStatus, SessionState};
