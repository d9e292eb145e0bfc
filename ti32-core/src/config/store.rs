//! Configuration store
//!
//! [`ConfigStore`] owns the one validated [`DeviceConfig`] for the boot
//! session. It is built once, before any networking starts, and handed to
//! consumers by reference. There is no way to change it afterwards.

use super::error::ConfigError;
use super::types::{DeviceConfig, RawConfigValues};
use super::validate::validate;

/// Owner of the validated device configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    config: DeviceConfig,
}

impl ConfigStore {
    /// Validate raw values and take ownership of the result
    ///
    /// Call exactly once per boot, before the WiFi and HTTP subsystems
    /// start. Any error means the device must not try to connect.
    pub fn load(raw: RawConfigValues<'_>) -> Result<Self, ConfigError> {
        let config = validate(&raw)?;
        Ok(Self { config })
    }

    /// Read-only view of the configuration
    pub fn get(&self) -> &DeviceConfig {
        &self.config
    }

    /// Give up the store, keeping the configuration
    pub fn into_inner(self) -> DeviceConfig {
        self.config
    }
}
