//! Mock hardware adapter for integration tests.
//!
//! Records every output call so tests can assert on the full command
//! history without touching real relays, and serves scripted or modelled
//! voltages through the measurement port.

use std::collections::VecDeque;

use battcycler::app::events::AppEvent;
use battcycler::app::ports::{EventSink, MeasurePort, OutputPort};

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCall {
    AllOff,
    StartCharge,
    StopCharge,
    StartDischarge,
    StopDischarge,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<OutputCall>,
    charge: bool,
    discharge: bool,
    /// Served one per voltage read, then `voltage` holds.
    pub script: VecDeque<f32>,
    pub voltage: f32,
    pub current: f32,
    /// Set if both outputs were ever on at once.
    pub interlock_violated: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(voltage: f32) -> Self {
        Self {
            calls: Vec::new(),
            charge: false,
            discharge: false,
            script: VecDeque::new(),
            voltage,
            current: 1.0,
            interlock_violated: false,
        }
    }

    pub fn scripted(voltages: &[f32]) -> Self {
        let mut hw = Self::new(voltages.last().copied().unwrap_or(0.0));
        hw.script = voltages.iter().copied().collect();
        hw
    }

    pub fn last_call(&self) -> Option<OutputCall> {
        self.calls.last().copied()
    }

    pub fn count(&self, call: OutputCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Move the modelled battery `dt_s` seconds along at `rate_v_per_s`
    /// in whichever direction the outputs push it.
    pub fn advance(&mut self, dt_s: f32, rate_v_per_s: f32, v_min: f32, v_max: f32) {
        if self.charge {
            self.voltage = (self.voltage + rate_v_per_s * dt_s).min(v_max);
        } else if self.discharge {
            self.voltage = (self.voltage - rate_v_per_s * dt_s).max(v_min);
        }
    }

    fn record(&mut self, call: OutputCall) {
        self.calls.push(call);
        if self.charge && self.discharge {
            self.interlock_violated = true;
        }
    }
}

impl OutputPort for MockHardware {
    fn all_off(&mut self) {
        self.charge = false;
        self.discharge = false;
        self.record(OutputCall::AllOff);
    }

    fn start_charge(&mut self) {
        self.discharge = false;
        self.charge = true;
        self.record(OutputCall::StartCharge);
    }

    fn stop_charge(&mut self) {
        self.charge = false;
        self.record(OutputCall::StopCharge);
    }

    fn start_discharge(&mut self) {
        self.charge = false;
        self.discharge = true;
        self.record(OutputCall::StartDischarge);
    }

    fn stop_discharge(&mut self) {
        self.discharge = false;
        self.record(OutputCall::StopDischarge);
    }

    fn is_charge_on(&self) -> bool {
        self.charge
    }

    fn is_discharge_on(&self) -> bool {
        self.discharge
    }
}

impl MeasurePort for MockHardware {
    fn read_voltage_v(&mut self) -> f32 {
        if let Some(v) = self.script.pop_front() {
            self.voltage = v;
        }
        self.voltage
    }

    fn read_current_a(&mut self) -> f32 {
        if self.charge || self.discharge {
            self.current
        } else {
            0.0
        }
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
