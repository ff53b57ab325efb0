//! Phase controller — phase timing, stop criteria and energy integration.
//!
//! ```text
//!          V ≥ chargeStop held ≥ hold            wait elapsed
//!   CHARGE ───────────────────────▶ WAIT C→D ──────────────▶ DISCHARGE
//!     ▲                                                          │
//!     │ wait elapsed                           V ≤ dischargeStop │
//!     └──────────────────────── WAIT D→C ◀───────────────────────┘
//! ```
//!
//! The controller follows the program state machine rather than leading it:
//! a non-Idle program mode starts it, an Idle mode hard-resets it.  Active
//! phase completion is reported through [`PhaseObserver`] before the wait
//! begins.
//!
//! A sensor that reads NaN makes every stop comparison false, so the phase
//! stalls and the energy goes NaN.  The controller does not retry; the
//! caller inspects [`PhaseController::last_sample`] and reports it.

pub mod clock;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::{HardwarePort, OutputPort, PhaseObserver};
use crate::program::{Mode, Telemetry};

use self::clock::{elapsed_ms, has_elapsed, ms_to_hours};

// ───────────────────────────────────────────────────────────────
// Types
// ───────────────────────────────────────────────────────────────

/// Controller lifecycle, synchronised to the program mode
/// (Off ↔ Idle, Running/Paused ↔ Charge/Discharge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunState {
    #[default]
    Off = 0,
    Running = 1,
    Paused = 2,
}

impl RunState {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Fine-grained phase, waits included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    #[default]
    Charge = 0,
    WaitChargeToDischarge = 1,
    Discharge = 2,
    WaitDischargeToCharge = 3,
}

impl Phase {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Charge or Discharge.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Charge | Self::Discharge)
    }

    /// Active phase matching a program mode.  Idle has none.
    pub const fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Charge => Some(Self::Charge),
            Mode::Discharge => Some(Self::Discharge),
            Mode::Idle => None,
        }
    }
}

/// Stop thresholds and wait durations.  Takes effect on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Charge ends once the voltage holds at or above this.
    pub charge_stop_voltage_v: f32,
    /// Continuous time above `charge_stop_voltage_v` (seconds).
    pub charge_hold_above_s: u32,
    pub wait_charge_to_discharge_s: u32,
    /// Discharge ends on the first sample at or below this.
    pub discharge_stop_voltage_v: f32,
    pub wait_discharge_to_charge_s: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            charge_stop_voltage_v: 14.5,
            charge_hold_above_s: 3 * 3600,
            wait_charge_to_discharge_s: 10,
            discharge_stop_voltage_v: 12.2,
            wait_discharge_to_charge_s: 10,
        }
    }
}

/// What a tick or sync changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    /// Run picked up from the program; `phase` is the entry phase.
    Started { phase: Phase },
    /// An active phase met its stop criterion.
    Completed {
        phase: Phase,
        energy_wh: f32,
        elapsed_s: u32,
        phase_count: u16,
    },
    /// A wait elapsed and the next active phase began.
    Entered { phase: Phase },
    /// Program went Idle; counters were reset.
    Stopped,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct PhaseController {
    config: PhaseConfig,
    run_state: RunState,
    phase: Phase,

    /// Finished active phases, seeded from the program on start.
    phase_count: u16,
    /// 1-based cycle number; 0 while Off.
    cycle: u16,

    phase_start_ms: Option<u32>,
    last_energy_ms: Option<u32>,
    phase_wh: f32,
    above_v_start_ms: Option<u32>,
    wait_start_ms: Option<u32>,

    /// Set by `resume`; the next tick re-enables the phase output.
    resume_pending: bool,
    last_sample: Option<(f32, f32)>,
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new(PhaseConfig::default())
    }
}

impl PhaseController {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            run_state: RunState::Off,
            phase: Phase::Charge,
            phase_count: 0,
            cycle: 0,
            phase_start_ms: None,
            last_energy_ms: None,
            phase_wh: 0.0,
            above_v_start_ms: None,
            wait_start_ms: None,
            resume_pending: false,
            last_sample: None,
        }
    }

    pub fn set_config(&mut self, config: PhaseConfig) {
        self.config = config;
    }

    pub fn config(&self) -> PhaseConfig {
        self.config
    }

    // ── Lifecycle overrides ──────────────────────────────────

    /// Off → Running.  Timers seed lazily on the next tick.
    pub fn start(&mut self) {
        if self.run_state == RunState::Off {
            info!("PHASE: start");
            self.run_state = RunState::Running;
        }
    }

    /// Hard reset: outputs off, every per-run counter zeroed.
    pub fn stop(&mut self, hw: &mut impl OutputPort) {
        hw.all_off();
        if self.run_state != RunState::Off {
            info!("PHASE: stop");
        }
        self.run_state = RunState::Off;
        self.phase = Phase::Charge;
        self.phase_count = 0;
        self.cycle = 0;
        self.phase_start_ms = None;
        self.last_energy_ms = None;
        self.phase_wh = 0.0;
        self.above_v_start_ms = None;
        self.wait_start_ms = None;
        self.resume_pending = false;
    }

    /// Running → Paused.  Outputs off; phase, timers and energy kept.
    pub fn pause(&mut self, hw: &mut impl OutputPort) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        hw.all_off();
        self.run_state = RunState::Paused;
        info!("PHASE: pause in {:?}", self.phase);
        true
    }

    /// Paused → Running.  The output comes back on the next tick.
    pub fn resume(&mut self) -> bool {
        if self.run_state != RunState::Paused {
            return false;
        }
        self.run_state = RunState::Running;
        self.resume_pending = true;
        info!("PHASE: resume in {:?}", self.phase);
        true
    }

    // ── Evaluation ───────────────────────────────────────────

    /// Align run state with the program mode.  Called at the top of every
    /// tick, and by the service right after a command so status reads are
    /// coherent without waiting for the next sample.
    pub fn sync(
        &mut self,
        now_ms: u32,
        tel: &Telemetry,
        hw: &mut impl OutputPort,
    ) -> Option<PhaseEvent> {
        if self.run_state == RunState::Off {
            let phase = Phase::for_mode(tel.mode)?;
            self.run_state = RunState::Running;
            self.phase = phase;
            self.reset_phase_timers(now_ms);
            self.wait_start_ms = None;
            self.phase_count = tel.phase_count;
            self.cycle = tel.phase_count / 2 + 1;
            info!(
                "PHASE: run picked up in {:?}, cycle {}",
                phase, self.cycle
            );
            return Some(PhaseEvent::Started { phase });
        }

        if tel.mode == Mode::Idle {
            self.stop(hw);
            return Some(PhaseEvent::Stopped);
        }

        None
    }

    /// One sample: sync, read, integrate, evaluate.  Repeated calls with
    /// the same `now_ms` change nothing.
    pub fn tick(
        &mut self,
        now_ms: u32,
        tel: &Telemetry,
        hw: &mut impl HardwarePort,
        observer: &mut impl PhaseObserver,
    ) -> Option<PhaseEvent> {
        self.last_sample = None;
        let synced = self.sync(now_ms, tel, hw);
        if synced == Some(PhaseEvent::Stopped) {
            return synced;
        }
        if self.run_state != RunState::Running {
            return synced;
        }

        if self.resume_pending {
            self.resume_pending = false;
            self.reenable_output(now_ms, hw);
        }

        let v = hw.read_voltage_v();
        let i = hw.read_current_a();
        self.last_sample = Some((v, i));
        debug!("PHASE: {:?} U={:.3} V I={:.3} A", self.phase, v, i);

        if self.phase.is_active() {
            self.integrate(now_ms, v, i);
        }

        let evaluated = match self.phase {
            Phase::Charge => self.eval_charge(now_ms, v, hw, observer),
            Phase::Discharge => self.eval_discharge(now_ms, v, hw, observer),
            Phase::WaitChargeToDischarge => {
                let wait_s = self.config.wait_charge_to_discharge_s;
                self.eval_wait(now_ms, wait_s, Phase::Discharge, hw)
            }
            Phase::WaitDischargeToCharge => {
                let wait_s = self.config.wait_discharge_to_charge_s;
                self.eval_wait(now_ms, wait_s, Phase::Charge, hw)
            }
        };

        evaluated.or(synced)
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_count(&self) -> u16 {
        self.phase_count
    }

    /// `phase_count / 2 + 1` while running, 0 while Off.
    pub fn cycle_index_1_based(&self) -> u16 {
        self.cycle
    }

    pub fn phase_energy_wh(&self) -> f32 {
        self.phase_wh
    }

    /// Seconds since the current phase (or wait) began; 0 before any.
    pub fn phase_elapsed_s(&self, now_ms: u32) -> u32 {
        self.phase_start_ms
            .map_or(0, |start| elapsed_ms(now_ms, start) / 1000)
    }

    /// Voltage and current read by the most recent tick, if it sampled.
    pub fn last_sample(&self) -> Option<(f32, f32)> {
        self.last_sample
    }

    // ── Internal ─────────────────────────────────────────────

    fn integrate(&mut self, now_ms: u32, v: f32, i: f32) {
        let last = *self.last_energy_ms.get_or_insert(now_ms);
        let dt_ms = elapsed_ms(now_ms, last);
        if dt_ms > 0 {
            self.phase_wh += v * i * ms_to_hours(dt_ms);
            self.last_energy_ms = Some(now_ms);
        }
    }

    fn eval_charge(
        &mut self,
        now_ms: u32,
        v: f32,
        hw: &mut impl OutputPort,
        observer: &mut impl PhaseObserver,
    ) -> Option<PhaseEvent> {
        if v >= self.config.charge_stop_voltage_v {
            let since = *self.above_v_start_ms.get_or_insert(now_ms);
            if has_elapsed(now_ms, since, self.config.charge_hold_above_s) {
                return Some(self.complete_active(
                    now_ms,
                    Phase::WaitChargeToDischarge,
                    hw,
                    observer,
                ));
            }
        } else if self.above_v_start_ms.take().is_some() {
            debug!("PHASE: charge hold reset at {:.3} V", v);
        }
        None
    }

    fn eval_discharge(
        &mut self,
        now_ms: u32,
        v: f32,
        hw: &mut impl OutputPort,
        observer: &mut impl PhaseObserver,
    ) -> Option<PhaseEvent> {
        if v <= self.config.discharge_stop_voltage_v {
            return Some(self.complete_active(
                now_ms,
                Phase::WaitDischargeToCharge,
                hw,
                observer,
            ));
        }
        None
    }

    fn eval_wait(
        &mut self,
        now_ms: u32,
        wait_s: u32,
        next: Phase,
        hw: &mut impl OutputPort,
    ) -> Option<PhaseEvent> {
        let since = *self.wait_start_ms.get_or_insert(now_ms);
        if !has_elapsed(now_ms, since, wait_s) {
            return None;
        }

        match next {
            Phase::Discharge => hw.start_discharge(),
            _ => hw.start_charge(),
        }
        self.phase = next;
        self.reset_phase_timers(now_ms);
        self.wait_start_ms = None;
        info!("PHASE: wait over, entering {:?}", next);
        Some(PhaseEvent::Entered { phase: next })
    }

    /// Report completion, count it, and park in `wait`.
    fn complete_active(
        &mut self,
        now_ms: u32,
        wait: Phase,
        hw: &mut impl OutputPort,
        observer: &mut impl PhaseObserver,
    ) -> PhaseEvent {
        let finished = self.phase;
        let energy_wh = self.phase_wh;
        let elapsed_s = self.phase_elapsed_s(now_ms);

        observer.phase_done(hw);

        self.phase_count = self.phase_count.saturating_add(1);
        self.cycle = self.phase_count / 2 + 1;

        hw.all_off();
        self.phase = wait;
        self.wait_start_ms = Some(now_ms);
        self.reset_phase_timers(now_ms);

        info!(
            "PHASE: {:?} done after {} s, {:.4} Wh, phaseCount={}",
            finished, elapsed_s, energy_wh, self.phase_count
        );
        PhaseEvent::Completed {
            phase: finished,
            energy_wh,
            elapsed_s,
            phase_count: self.phase_count,
        }
    }

    fn reset_phase_timers(&mut self, now_ms: u32) {
        self.phase_start_ms = Some(now_ms);
        self.last_energy_ms = Some(now_ms);
        self.phase_wh = 0.0;
        self.above_v_start_ms = None;
    }

    /// Restore the phase output after a pause.  The energy point is reseeded
    /// so the paused interval is not integrated; the charge hold keeps its
    /// start.
    fn reenable_output(&mut self, now_ms: u32, hw: &mut impl OutputPort) {
        match self.phase {
            Phase::Charge => hw.start_charge(),
            Phase::Discharge => hw.start_discharge(),
            Phase::WaitChargeToDischarge | Phase::WaitDischargeToCharge => {}
        }
        self.last_energy_ms = Some(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::fake::FakeHw;
    use crate::program::{CommandType, IdleReason, Program, ProgramStateMachine};

    /// Observer that only counts notifications.
    #[derive(Default)]
    struct Counter(u32);

    impl PhaseObserver for Counter {
        fn phase_done(&mut self, _hw: &mut impl OutputPort) {
            self.0 += 1;
        }
    }

    fn running(mode: Mode) -> Telemetry {
        Telemetry {
            mode,
            ..Telemetry::default()
        }
    }

    fn short_config() -> PhaseConfig {
        PhaseConfig {
            charge_stop_voltage_v: 14.5,
            charge_hold_above_s: 10,
            wait_charge_to_discharge_s: 5,
            discharge_stop_voltage_v: 12.2,
            wait_discharge_to_charge_s: 5,
        }
    }

    #[test]
    fn off_until_program_leaves_idle() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(13.0, 1.0);
        let mut obs = Counter::default();

        assert_eq!(pc.tick(0, &Telemetry::default(), &mut hw, &mut obs), None);
        assert_eq!(pc.run_state(), RunState::Off);
        assert_eq!(pc.cycle_index_1_based(), 0);

        let ev = pc.tick(1000, &running(Mode::Discharge), &mut hw, &mut obs);
        assert_eq!(ev, Some(PhaseEvent::Started { phase: Phase::Discharge }));
        assert_eq!(pc.run_state(), RunState::Running);
        assert_eq!(pc.phase(), Phase::Discharge);
        assert_eq!(pc.cycle_index_1_based(), 1);
    }

    #[test]
    fn charge_requires_continuous_hold() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(14.6, 1.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Charge);

        pc.tick(0, &tel, &mut hw, &mut obs); // hold starts
        pc.tick(1_000, &tel, &mut hw, &mut obs);
        pc.tick(8_000, &tel, &mut hw, &mut obs);

        hw.voltage = 14.4; // dip resets the hold
        pc.tick(9_000, &tel, &mut hw, &mut obs);

        hw.voltage = 14.5;
        pc.tick(10_000, &tel, &mut hw, &mut obs); // hold restarts here
        pc.tick(19_999, &tel, &mut hw, &mut obs);
        assert_eq!(obs.0, 0);
        assert_eq!(pc.phase(), Phase::Charge);

        let ev = pc.tick(20_000, &tel, &mut hw, &mut obs);
        assert!(matches!(
            ev,
            Some(PhaseEvent::Completed { phase: Phase::Charge, phase_count: 1, .. })
        ));
        assert_eq!(obs.0, 1);
        assert_eq!(pc.phase(), Phase::WaitChargeToDischarge);
        assert_eq!(pc.phase_energy_wh(), 0.0);
        assert!(!hw.charge && !hw.discharge);
    }

    #[test]
    fn discharge_stops_on_first_low_sample() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(12.5, -1.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Discharge);

        pc.tick(0, &tel, &mut hw, &mut obs);
        pc.tick(1_000, &tel, &mut hw, &mut obs);
        assert_eq!(obs.0, 0);

        hw.voltage = 12.2;
        pc.tick(2_000, &tel, &mut hw, &mut obs);
        assert_eq!(obs.0, 1);
        assert_eq!(pc.phase(), Phase::WaitDischargeToCharge);
    }

    #[test]
    fn wait_then_next_active_phase() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(12.5, 0.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Discharge);

        pc.tick(0, &tel, &mut hw, &mut obs);
        hw.voltage = 12.0;
        pc.tick(1_000, &tel, &mut hw, &mut obs); // completes at 1 s
        assert_eq!(pc.phase(), Phase::WaitDischargeToCharge);

        assert_eq!(pc.tick(5_999, &tel, &mut hw, &mut obs), None);
        let ev = pc.tick(6_000, &tel, &mut hw, &mut obs);
        assert_eq!(ev, Some(PhaseEvent::Entered { phase: Phase::Charge }));
        assert!(hw.charge);
        assert_eq!(pc.phase_elapsed_s(9_000), 3);
    }

    #[test]
    fn energy_uses_actual_elapsed_time() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(12.0, 2.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Charge);

        pc.tick(0, &tel, &mut hw, &mut obs);
        pc.tick(1_800_000, &tel, &mut hw, &mut obs); // 0.5 h
        pc.tick(1_800_000, &tel, &mut hw, &mut obs); // repeat is a no-op
        pc.tick(3_600_000, &tel, &mut hw, &mut obs); // 1 h total

        assert!((pc.phase_energy_wh() - 24.0).abs() < 1e-3);
    }

    #[test]
    fn energy_integrates_across_clock_wrap() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(10.0, 1.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Charge);

        let start = u32::MAX - 1_799_999;
        pc.tick(start, &tel, &mut hw, &mut obs);
        pc.tick(1_800_000, &tel, &mut hw, &mut obs); // 1 h later, wrapped

        assert!((pc.phase_energy_wh() - 10.0).abs() < 1e-3);
        assert_eq!(pc.phase_elapsed_s(1_800_000), 3600);
    }

    #[test]
    fn nan_reading_stalls_and_poisons_energy() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(f32::NAN, 1.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Discharge);

        pc.tick(0, &tel, &mut hw, &mut obs);
        pc.tick(60_000, &tel, &mut hw, &mut obs);
        assert_eq!(obs.0, 0);
        assert_eq!(pc.phase(), Phase::Discharge);
        assert!(pc.phase_energy_wh().is_nan());
        assert!(pc.last_sample().is_some_and(|(v, _)| v.is_nan()));
    }

    #[test]
    fn pause_preserves_phase_and_energy() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(13.0, -2.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Discharge);
        hw.start_discharge();

        pc.tick(0, &tel, &mut hw, &mut obs);
        pc.tick(3_600_000, &tel, &mut hw, &mut obs);
        let wh = pc.phase_energy_wh();
        assert!((wh + 26.0).abs() < 1e-3);

        assert!(pc.pause(&mut hw));
        assert!(!hw.discharge);
        pc.tick(7_200_000, &tel, &mut hw, &mut obs);
        assert_eq!(pc.run_state(), RunState::Paused);
        assert_eq!(pc.phase(), Phase::Discharge);
        assert_eq!(pc.phase_energy_wh(), wh);

        assert!(pc.resume());
        assert_eq!(pc.run_state(), RunState::Running);
        assert_eq!(pc.phase_energy_wh(), wh);
        assert_eq!(pc.phase_elapsed_s(7_200_000), 7200);

        // Output comes back and the paused hour is not integrated.
        pc.tick(7_200_000, &tel, &mut hw, &mut obs);
        assert!(hw.discharge);
        assert_eq!(pc.phase_energy_wh(), wh);
    }

    #[test]
    fn pause_mid_hold_keeps_hold_start() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(14.6, 1.0);
        let mut obs = Counter::default();
        let tel = running(Mode::Charge);

        pc.tick(0, &tel, &mut hw, &mut obs); // hold starts
        pc.tick(8_000, &tel, &mut hw, &mut obs);
        assert!(pc.pause(&mut hw));
        assert!(pc.resume());

        pc.tick(9_000, &tel, &mut hw, &mut obs);
        assert!(hw.charge);
        assert_eq!(obs.0, 0);

        let ev = pc.tick(11_000, &tel, &mut hw, &mut obs);
        assert!(matches!(
            ev,
            Some(PhaseEvent::Completed { phase: Phase::Charge, .. })
        ));
        assert_eq!(obs.0, 1);
    }

    #[test]
    fn pause_and_resume_are_state_guarded() {
        let mut pc = PhaseController::default();
        let mut hw = FakeHw::default();
        assert!(!pc.pause(&mut hw));
        assert!(!pc.resume());
        assert_eq!(pc.run_state(), RunState::Off);
    }

    #[test]
    fn idle_program_hard_resets() {
        let mut pc = PhaseController::new(short_config());
        let mut hw = FakeHw::reading(12.0, 0.0);
        let mut obs = Counter::default();

        pc.tick(0, &running(Mode::Discharge), &mut hw, &mut obs);
        pc.tick(1_000, &running(Mode::Discharge), &mut hw, &mut obs);
        assert_eq!(pc.phase_count(), 1);

        let ev = pc.tick(2_000, &Telemetry::default(), &mut hw, &mut obs);
        assert_eq!(ev, Some(PhaseEvent::Stopped));
        assert_eq!(pc.run_state(), RunState::Off);
        assert_eq!(pc.phase(), Phase::Charge);
        assert_eq!(pc.phase_count(), 0);
        assert_eq!(pc.cycle_index_1_based(), 0);
        assert_eq!(pc.phase_elapsed_s(5_000), 0);
    }

    #[test]
    fn seeds_counters_from_program() {
        let mut pc = PhaseController::default();
        let mut hw = FakeHw::default();
        let tel = Telemetry {
            mode: Mode::Charge,
            idle_reason: IdleReason::Ready,
            phase_count: 5,
            completed_cycles: 2,
        };
        pc.sync(0, &tel, &mut hw);
        assert_eq!(pc.phase_count(), 5);
        assert_eq!(pc.cycle_index_1_based(), 3);
    }

    #[test]
    fn drives_program_through_full_run() {
        let mut sm = ProgramStateMachine::new(Program {
            cycles: 1,
            start_mode: Mode::Charge,
            stop_mode: Mode::Discharge,
        });
        let mut pc = PhaseController::new(PhaseConfig {
            charge_hold_above_s: 0,
            ..short_config()
        });
        let mut hw = FakeHw::reading(14.6, 1.0);

        sm.command(CommandType::Start, &mut hw);
        let mut now = 0;
        pc.tick(now, &sm.telemetry(), &mut hw, &mut sm);
        assert_eq!(pc.phase(), Phase::WaitChargeToDischarge);
        assert_eq!(sm.mode(), Mode::Discharge);
        assert!(!hw.charge && !hw.discharge, "outputs rest during the wait");

        hw.voltage = 12.0;
        now += 5_000;
        pc.tick(now, &sm.telemetry(), &mut hw, &mut sm);
        assert_eq!(pc.phase(), Phase::Discharge);
        assert!(hw.discharge);

        now += 1_000;
        pc.tick(now, &sm.telemetry(), &mut hw, &mut sm);
        assert_eq!(sm.telemetry().idle_reason, IdleReason::Done);

        now += 1_000;
        let ev = pc.tick(now, &sm.telemetry(), &mut hw, &mut sm);
        assert_eq!(ev, Some(PhaseEvent::Stopped));
        assert_eq!(pc.run_state(), RunState::Off);
    }
}
