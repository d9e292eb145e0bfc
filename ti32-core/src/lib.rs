//! Board-agnostic configuration core for the TI-32 bridge firmware
//!
//! The bridge is an ESP32 that joins a WiFi network and forwards questions
//! from a graphing calculator to a remote inference server. This crate owns
//! everything about its configuration that does not depend on hardware:
//!
//! - Raw configuration values and the typed, validated [`config::DeviceConfig`]
//! - Placeholder detection for unedited template values
//! - Server base URL parsing and endpoint construction
//! - [`config::ConfigStore`], the single owner of the validated configuration
//! - [`config::ConfigSlot`], a boot-wide slot other tasks read from

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
