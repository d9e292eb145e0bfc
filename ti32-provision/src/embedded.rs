//! Compiled-in device configuration
//!
//! Generated by the build script from `device.toml` and the `WIFI_SSID`,
//! `WIFI_PASS`, `HTTP_USERNAME`, `HTTP_PASSWORD`, `SERVER` and `CHAT_NAME`
//! environment variables. `None` when the build had neither. Values here
//! already passed validation at build time.

use ti32_core::config::RawConfigValues;

include!(concat!(env!("OUT_DIR"), "/embedded_config.rs"));

