//! Simulated battery for bench runs without a cell attached.
//!
//! Voltage ramps up while charging and down while discharging at fixed
//! gradients, clamped to `[v_min, v_max]`; it holds when both outputs are
//! off.  Current is a per-state constant.

use crate::config::SimConfig;
use crate::phase::clock::elapsed_ms;

pub struct SimulatedBattery {
    cfg: SimConfig,
    voltage: f32,
    last_ms: Option<u32>,
}

impl SimulatedBattery {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            voltage: cfg.start_v,
            cfg,
            last_ms: None,
        }
    }

    /// Advance the model to `now_ms` and return the terminal voltage.
    pub fn voltage_v(&mut self, now_ms: u32, charging: bool, discharging: bool) -> f32 {
        let last = self.last_ms.replace(now_ms).unwrap_or(now_ms);
        let dt_s = elapsed_ms(now_ms, last) as f32 / 1000.0;

        match (charging, discharging) {
            (true, false) => self.voltage += self.cfg.charge_v_per_s * dt_s,
            (false, true) => self.voltage -= self.cfg.discharge_v_per_s * dt_s,
            _ => {}
        }
        self.voltage = self.voltage.clamp(self.cfg.v_min, self.cfg.v_max);
        self.voltage
    }

    pub fn current_a(&self, charging: bool, discharging: bool) -> f32 {
        match (charging, discharging) {
            (true, false) => self.cfg.current_charge_a,
            (false, true) => self.cfg.current_discharge_a,
            _ => self.cfg.current_idle_a,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_returns_start_voltage() {
        let mut sim = SimulatedBattery::new(SimConfig::default());
        assert!((sim.voltage_v(5_000, true, false) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn ramps_by_gradient_and_clamps() {
        let mut sim = SimulatedBattery::new(SimConfig::default());
        sim.voltage_v(0, true, false);
        let v = sim.voltage_v(100_000, true, false); // +1 V
        assert!((v - 13.0).abs() < 1e-4);

        let v = sim.voltage_v(1_000_000, true, false);
        assert!((v - 14.6).abs() < 1e-6);

        let v = sim.voltage_v(2_000_000, false, true);
        assert!((v - 9.0).abs() < 1e-6);
    }

    #[test]
    fn holds_when_outputs_off() {
        let mut sim = SimulatedBattery::new(SimConfig::default());
        sim.voltage_v(0, false, false);
        assert!((sim.voltage_v(60_000, false, false) - 12.0).abs() < 1e-6);
        assert!((sim.current_a(false, false) - 0.02).abs() < 1e-6);
        assert!((sim.current_a(true, false) - 1.5).abs() < 1e-6);
    }
}
