//! JSON configuration for camera devices.

use std::{fs, path::Path};

use camtrack_core::TrackerParams;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Per-device settings.
///
/// `intrinsics` and `distortion` seed the device until a persisted record
/// replaces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub tracker: TrackerParams,
    #[serde(default)]
    pub intrinsics: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub distortion: Option<Vec<f64>>,
}

impl DeviceConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
