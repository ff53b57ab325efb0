//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the relay pair and the selected [`SensorBackend`], exposing them
//! through [`OutputPort`] and [`MeasurePort`].  This is the only module
//! in the system that touches actual hardware.  The simulated backend
//! reads the relay state and the adapter's own clock.

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use crate::adapters::time::MonotonicClock;
use crate::app::ports::{MeasurePort, OutputPort};
use crate::config::SensorBackendKind;
use crate::drivers::relay::RelayPair;
use crate::sensors::adc::AdcReader;
use crate::sensors::{OutputState, SensorBackend};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<C, D, I2C, A> {
    relays: RelayPair<C, D>,
    sensor: SensorBackend<I2C, A>,
    clock: MonotonicClock,
}

impl<C, D, I2C, A> HardwareAdapter<C, D, I2C, A>
where
    C: OutputPin,
    D: OutputPin,
    I2C: I2c,
    A: AdcReader,
{
    pub fn new(relays: RelayPair<C, D>, sensor: SensorBackend<I2C, A>) -> Self {
        Self {
            relays,
            sensor,
            clock: MonotonicClock::new(),
        }
    }

    pub fn sensor_kind(&self) -> SensorBackendKind {
        self.sensor.kind()
    }

    fn outputs(&self) -> OutputState {
        OutputState {
            charging: self.relays.is_charge_on(),
            discharging: self.relays.is_discharge_on(),
        }
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl<C, D, I2C, A> OutputPort for HardwareAdapter<C, D, I2C, A>
where
    C: OutputPin,
    D: OutputPin,
    I2C: I2c,
    A: AdcReader,
{
    fn all_off(&mut self) {
        self.relays.all_off();
    }

    fn start_charge(&mut self) {
        self.relays.start_charge();
    }

    fn stop_charge(&mut self) {
        self.relays.stop_charge();
    }

    fn start_discharge(&mut self) {
        self.relays.start_discharge();
    }

    fn stop_discharge(&mut self) {
        self.relays.stop_discharge();
    }

    fn is_charge_on(&self) -> bool {
        self.relays.is_charge_on()
    }

    fn is_discharge_on(&self) -> bool {
        self.relays.is_discharge_on()
    }
}

// ── MeasurePort implementation ────────────────────────────────

impl<C, D, I2C, A> MeasurePort for HardwareAdapter<C, D, I2C, A>
where
    C: OutputPin,
    D: OutputPin,
    I2C: I2c,
    A: AdcReader,
{
    fn read_voltage_v(&mut self) -> f32 {
        let out = self.outputs();
        self.sensor.voltage_v(self.clock.now_ms(), out)
    }

    fn read_current_a(&mut self) -> f32 {
        let out = self.outputs();
        self.sensor.current_a(out)
    }
}
