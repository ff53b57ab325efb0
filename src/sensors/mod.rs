//! Measurement backends behind a single runtime-selected [`SensorBackend`].
//!
//! | Variant        | Source                          |
//! |----------------|---------------------------------|
//! | `Real`         | INA219 over I²C                 |
//! | `Simulated`    | [`sim::SimulatedBattery`] model |
//! | `AdcFallback`  | scaled ADC channels             |
//!
//! Read failures never propagate: they are logged and reported as NaN,
//! which the phase controller turns into a visible stall.

pub mod adc;
pub mod ina219;
pub mod sim;

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::config::{HardwareConfig, SensorBackendKind, SimConfig};
use adc::{AdcFallback, AdcReader};
use ina219::Ina219;
use sim::SimulatedBattery;

/// Relay state the simulated model reacts to.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputState {
    pub charging: bool,
    pub discharging: bool,
}

pub enum SensorBackend<I2C, A> {
    Real(Ina219<I2C>),
    Simulated(SimulatedBattery),
    AdcFallback(AdcFallback<A>),
}

impl<I2C: I2c, A: AdcReader> SensorBackend<I2C, A> {
    /// Build the configured backend.  An INA219 that fails to initialise
    /// degrades to the ADC path.
    pub fn select(hw: &HardwareConfig, sim: SimConfig, i2c: I2C, adc: A) -> Self {
        match hw.sensor {
            SensorBackendKind::Simulated => {
                info!("sensors: simulated battery");
                Self::Simulated(SimulatedBattery::new(sim))
            }
            SensorBackendKind::Adc => {
                info!("sensors: ADC");
                Self::AdcFallback(AdcFallback::new(adc, hw.adc))
            }
            SensorBackendKind::Ina219 => {
                let mut ina = Ina219::new(i2c, hw.ina219.address, hw.ina219.preset);
                match ina.init() {
                    Ok(()) => {
                        info!(
                            "sensors: INA219 @0x{:02X} {:?}",
                            hw.ina219.address,
                            ina.preset()
                        );
                        Self::Real(ina)
                    }
                    Err(e) => {
                        warn!("sensors: INA219 init failed ({}), using ADC fallback", e);
                        Self::AdcFallback(AdcFallback::new(adc, hw.adc))
                    }
                }
            }
        }
    }

    pub fn kind(&self) -> SensorBackendKind {
        match self {
            Self::Real(_) => SensorBackendKind::Ina219,
            Self::Simulated(_) => SensorBackendKind::Simulated,
            Self::AdcFallback(_) => SensorBackendKind::Adc,
        }
    }

    pub fn voltage_v(&mut self, now_ms: u32, out: OutputState) -> f32 {
        match self {
            Self::Real(ina) => ina.bus_voltage_v().unwrap_or(f32::NAN),
            Self::Simulated(sim) => sim.voltage_v(now_ms, out.charging, out.discharging),
            Self::AdcFallback(adc) => adc.voltage_v(),
        }
    }

    pub fn current_a(&mut self, out: OutputState) -> f32 {
        match self {
            Self::Real(ina) => ina.current_a().unwrap_or(f32::NAN),
            Self::Simulated(sim) => sim.current_a(out.charging, out.discharging),
            Self::AdcFallback(adc) => adc.current_a(),
        }
    }
}
