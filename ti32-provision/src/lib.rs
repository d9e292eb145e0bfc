//! TI-32 configuration provisioning
//!
//! Boot-time resolution of the device configuration:
//!
//! - [`toml`] - Minimal parser for TOML written to the provisioning partition
//! - [`record`] - Versioned postcard record written by the provisioning tool
//! - [`loader`] - Flash-backed loader with the compiled-in fallback
//! - [`embedded`] - Values compiled in from `device.toml` by the build script
//!
//! ```ignore
//! static CONFIG: ConfigSlot = ConfigSlot::new();
//!
//! let mut persistence = ConfigPersistence::new(storage);
//! let config = persistence.load_into(&CONFIG).await?;
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the modules below
mod fmt;

pub mod embedded;
pub mod loader;
pub mod record;
pub mod toml;

pub use embedded::EMBEDDED_CONFIG;
pub use loader::{ConfigPersistence, LoadError, MAX_TOML_SIZE};
pub use record::{ProvisionedRecord, RECORD_VERSION};
pub use toml::{parse_config, ParseError};
