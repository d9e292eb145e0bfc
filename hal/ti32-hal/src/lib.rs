//! TI-32 Hardware Abstraction Layer
//!
//! Traits implemented by chip-specific HALs (ESP32-S3 via esp-storage, or an
//! in-memory stand-in on the host) so that board-agnostic code can read and
//! write persistent data without knowing the flash layout.
//!
//! # Traits
//!
//! - [`flash::FlashStorage`] - Persistent key-value storage

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod flash;

pub use flash::{FlashError, FlashStorage, StorageKey};
