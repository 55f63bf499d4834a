use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::presets::RangingParams;
use crate::transport::GattProfile;

/// Settings for the session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Local BLE name advertised by `begin` (default: "UWB Accessory")
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Maximum number of concurrently connected peers (default: 4)
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Elapsed-time budget for one teardown sequence (default: 2000)
    #[serde(default = "default_teardown_timeout_ms")]
    pub teardown_timeout_ms: u64,

    /// Transition attempts allowed in one teardown sequence (default: 8)
    #[serde(default = "default_max_teardown_attempts")]
    pub max_teardown_attempts: u32,

    /// Largest message written to a characteristic (default: 128).
    /// Must not exceed `gatt.char_len`.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// GATT services and characteristics
    #[serde(default)]
    pub gatt: GattProfile,

    /// Fixed ranging parameters passed along with every start
    #[serde(default)]
    pub ranging: Option<RangingParams>,
}

fn default_device_name() -> String {
    "UWB Accessory".to_string()
}

fn default_max_sessions() -> usize {
    4
}

fn default_teardown_timeout_ms() -> u64 {
    2000
}

fn default_max_teardown_attempts() -> u32 {
    8
}

fn default_max_message_len() -> usize {
    128
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            max_sessions: default_max_sessions(),
            teardown_timeout_ms: default_teardown_timeout_ms(),
            max_teardown_attempts: default_max_teardown_attempts(),
            max_message_len: default_max_message_len(),
            gatt: GattProfile::default(),
            ranging: None,
        }
    }
}

impl ManagerConfig {
    /// Parse configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    /// Returns default config if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject settings that would make the manager unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(SessionError::Config("max_sessions must be at least 1".into()));
        }
        if self.max_teardown_attempts < 2 {
            // Started -> NotStarted -> NotCreated takes two transitions
            return Err(SessionError::Config(
                "max_teardown_attempts must be at least 2".into(),
            ));
        }
        if self.max_message_len < 2 {
            return Err(SessionError::Config(
                "max_message_len must fit a response id and one byte".into(),
            ));
        }
        if self.max_message_len > self.gatt.char_len {
            return Err(SessionError::Config(format!(
                "max_message_len {} exceeds characteristic size {}",
                self.max_message_len, self.gatt.char_len
            )));
        }
        Ok(())
    }

    /// Teardown budget as a `Duration`.
    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}
