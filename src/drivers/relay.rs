//! Charge / discharge relay pair.
//!
//! ## Safety contract
//!
//! Both paths must never conduct at once.  Every start call releases the
//! opposite relay *before* energising its own; this driver is the
//! interlock, the domain above it only expresses intent.
//!
//! Each relay sits behind an `embedded_hal` [`OutputPin`] with
//! configurable polarity.  A missing pin (`None`) is an unwired output:
//! writes are no-ops but the logical state is still tracked.

use embedded_hal::digital::OutputPin;
use log::warn;

/// One relay coil with polarity.
pub struct Relay<P> {
    pin: Option<P>,
    active_high: bool,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    pub fn new(pin: Option<P>, active_high: bool) -> Self {
        Self {
            pin,
            active_high,
            on: false,
        }
    }

    pub fn set(&mut self, on: bool) {
        self.on = on;
        let Some(pin) = self.pin.as_mut() else {
            return;
        };
        let high = on == self.active_high;
        let res = if high { pin.set_high() } else { pin.set_low() };
        if let Err(e) = res {
            warn!("relay write failed: {:?}", e);
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_wired(&self) -> bool {
        self.pin.is_some()
    }
}

/// Interlocked charger + load outputs.
pub struct RelayPair<C, D> {
    charge: Relay<C>,
    discharge: Relay<D>,
}

impl<C: OutputPin, D: OutputPin> RelayPair<C, D> {
    /// Construct and drive both outputs to their off level.
    pub fn new(charge: Relay<C>, discharge: Relay<D>) -> Self {
        let mut pair = Self { charge, discharge };
        pair.all_off();
        pair
    }

    pub fn all_off(&mut self) {
        self.charge.set(false);
        self.discharge.set(false);
    }

    pub fn start_charge(&mut self) {
        self.discharge.set(false);
        self.charge.set(true);
    }

    pub fn stop_charge(&mut self) {
        self.charge.set(false);
    }

    pub fn start_discharge(&mut self) {
        self.charge.set(false);
        self.discharge.set(true);
    }

    pub fn stop_discharge(&mut self) {
        self.discharge.set(false);
    }

    pub fn is_charge_on(&self) -> bool {
        self.charge.is_on()
    }

    pub fn is_discharge_on(&self) -> bool {
        self.discharge.is_on()
    }
}
