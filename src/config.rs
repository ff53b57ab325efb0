//! System configuration parameters
//!
//! All tunable parameters for the battery cycler.  Program and phase
//! parameters can be changed at runtime through the control surface;
//! everything else is fixed at boot.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::phase::PhaseConfig;
use crate::pins;
use crate::program::Program;
use crate::sensors::ina219::CalibrationPreset;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Program + phase evaluation interval (seconds)
    pub core_sample_interval_s: u32,
    /// Ring log row interval (seconds)
    pub log_store_interval_s: u32,

    // --- Ring log ---
    /// RAM budget for the measurement history (bytes)
    pub log_ram_bytes: usize,

    // --- Run parameters ---
    pub phase: PhaseConfig,
    pub program: Program,

    // --- Board ---
    pub hardware: HardwareConfig,
    pub sim: SimConfig,

    // --- Network ---
    pub net: NetConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            core_sample_interval_s: 15,
            log_store_interval_s: 15 * 60, // 15 min CSV resolution

            // Ring log
            log_ram_bytes: 64 * 1024,

            phase: PhaseConfig::default(),
            program: Program::default(),

            hardware: HardwareConfig::default(),
            sim: SimConfig::default(),

            net: NetConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Reject values the driver loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.core_sample_interval_s == 0 {
            return Err(Error::Config("core sample interval must be non-zero"));
        }
        if self.log_store_interval_s == 0 {
            return Err(Error::Config("log store interval must be non-zero"));
        }
        if self.log_ram_bytes == 0 {
            return Err(Error::Config("log RAM budget must be non-zero"));
        }
        if self.sim.v_min > self.sim.v_max {
            return Err(Error::Config("simulation clamp range is inverted"));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Hardware
// ───────────────────────────────────────────────────────────────

/// Which measurement path feeds voltage and current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorBackendKind {
    /// INA219 on I²C; falls back to the ADC when it does not answer.
    #[default]
    Ina219,
    /// Battery model driven by the relay state.
    Simulated,
    /// Scaled ADC channels only.
    Adc,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// `None` leaves the output unwired.
    pub charge_pin: Option<i32>,
    pub discharge_pin: Option<i32>,
    pub charge_active_high: bool,
    pub discharge_active_high: bool,

    pub sensor: SensorBackendKind,
    pub ina219: Ina219Config,
    pub adc: AdcConfig,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            charge_pin: Some(pins::CHARGE_RELAY_GPIO),
            discharge_pin: Some(pins::DISCHARGE_RELAY_GPIO),
            charge_active_high: pins::CHARGE_ACTIVE_HIGH,
            discharge_active_high: pins::DISCHARGE_ACTIVE_HIGH,
            sensor: SensorBackendKind::default(),
            ina219: Ina219Config::default(),
            adc: AdcConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ina219Config {
    pub address: u8,
    pub sda_pin: i32,
    pub scl_pin: i32,
    pub preset: CalibrationPreset,
}

impl Default for Ina219Config {
    fn default() -> Self {
        Self {
            address: pins::INA219_I2C_ADDR,
            sda_pin: pins::I2C_SDA_GPIO,
            scl_pin: pins::I2C_SCL_GPIO,
            preset: CalibrationPreset::default(),
        }
    }
}

/// Linear calibration `x * scale + offset`, with `x` the normalised
/// (0..=1) raw reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    pub voltage_pin: Option<i32>,
    pub current_pin: Option<i32>,
    pub voltage_scale: f32,
    pub voltage_offset: f32,
    pub current_scale: f32,
    pub current_offset: f32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            voltage_pin: None,
            current_pin: None,
            voltage_scale: 1.0,
            voltage_offset: 0.0,
            current_scale: 1.0,
            current_offset: 0.0,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Network
// ───────────────────────────────────────────────────────────────

/// Station credentials are baked in at build time from
/// `BATTCYCLER_WIFI_SSID` / `BATTCYCLER_WIFI_PASS`.  Without an SSID, or
/// when the station does not associate within `sta_timeout_ms`, the
/// device opens its own access point instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    pub enabled: bool,
    pub sta_ssid: heapless::String<32>,
    pub sta_password: heapless::String<64>,
    pub sta_timeout_ms: u32,
    pub ap_ssid: heapless::String<32>,
    /// Empty for an open access point.
    pub ap_password: heapless::String<64>,
    pub ap_channel: u8,
    /// mDNS host name, served as `<hostname>.local`.
    pub hostname: heapless::String<24>,
    pub http_port: u16,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sta_ssid: truncated(option_env!("BATTCYCLER_WIFI_SSID").unwrap_or("")),
            sta_password: truncated(option_env!("BATTCYCLER_WIFI_PASS").unwrap_or("")),
            sta_timeout_ms: 15_000,
            ap_ssid: truncated("BatteryTester"),
            ap_password: heapless::String::new(),
            ap_channel: 6,
            hostname: truncated("batterytester"),
            http_port: 80,
        }
    }
}

fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// Parameters of the simulated battery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub start_v: f32,
    /// Voltage rise while charging (V/s)
    pub charge_v_per_s: f32,
    /// Voltage fall while discharging (V/s)
    pub discharge_v_per_s: f32,
    pub v_min: f32,
    pub v_max: f32,
    pub current_charge_a: f32,
    pub current_discharge_a: f32,
    pub current_idle_a: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_v: 12.0,
            charge_v_per_s: 0.01,
            discharge_v_per_s: 0.01,
            v_min: 9.0,
            v_max: 14.6,
            current_charge_a: 1.5,
            current_discharge_a: 1.0,
            current_idle_a: 0.02,
        }
    }
}
