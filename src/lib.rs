//! BattCycler firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod phase;
pub mod program;
pub mod ringlog;

pub mod pins;

// ESP-IDF-only pieces are cfg-gated inside these modules.
pub mod adapters;
pub mod drivers;
pub mod sensors;

// Lock provider for `critical-section` on the device.
mod esp_link_shims;
