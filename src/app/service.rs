//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the program state machine, the phase controller and
//! the live configuration.  It exposes a clean, hardware-agnostic API.  All
//! I/O flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  MeasurePort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                  │         AppService           │
//!  OutputPort  ◀── │  Program SM · PhaseController │ ──▶ SharedRingLog
//!                  └─────────────────────────────┘
//! ```
//!
//! [`AppService::poll`] is the driver cadence: at most one core evaluation
//! per `core_sample_interval_s` and at most one ring log row per
//! `log_store_interval_s`.  Interval checks are wrap-safe.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::error::{ApiError, Result};
use crate::phase::clock::{elapsed_ms, has_elapsed};
use crate::phase::{PhaseConfig, PhaseController};
use crate::program::{CommandType, Mode, Program, ProgramStateMachine, Telemetry};
use crate::ringlog::SharedRingLog;
use crate::ringlog::schema::Value;

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{EventSink, HardwarePort, MeasurePort, OutputPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    program: ProgramStateMachine,
    phase: PhaseController,

    last_core_ms: Option<u32>,
    last_log_ms: Option<u32>,
    /// Previous `poll` timestamp, for the uptime accumulator.
    last_seen_ms: Option<u32>,
    /// Uptime built from wrapping deltas, so it survives counter wrap.
    uptime_ms: u64,
}

impl AppService {
    /// Construct the service from configuration.  Starts Idle(Ready).
    pub fn new(config: SystemConfig) -> Self {
        let program = ProgramStateMachine::new(config.program);
        let phase = PhaseController::new(config.phase);
        Self {
            config,
            program,
            phase,
            last_core_ms: None,
            last_log_ms: None,
            last_seen_ms: None,
            uptime_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Force outputs off and announce readiness.
    pub fn start(
        &mut self,
        hw: &mut impl OutputPort,
        log: &SharedRingLog,
        sink: &mut impl EventSink,
    ) {
        hw.all_off();
        let log_capacity = log.with(|l| l.capacity());
        sink.emit(&AppEvent::Started { log_capacity });
        info!(
            "AppService started, core every {} s, log every {} s, {} rows",
            self.config.core_sample_interval_s, self.config.log_store_interval_s, log_capacity
        );
    }

    // ── Driver cadence ────────────────────────────────────────

    /// Run whatever is due at `now_ms`.  Call as often as convenient.
    pub fn poll(
        &mut self,
        now_ms: u32,
        hw: &mut impl HardwarePort,
        log: &SharedRingLog,
        sink: &mut impl EventSink,
    ) {
        self.advance_uptime(now_ms);

        if Self::due(self.last_core_ms, now_ms, self.config.core_sample_interval_s) {
            self.last_core_ms = Some(now_ms);
            self.core_tick(now_ms, hw, sink);
        }

        if Self::due(self.last_log_ms, now_ms, self.config.log_store_interval_s) {
            self.last_log_ms = Some(now_ms);
            self.store_row(hw, log, sink);
        }
    }

    /// One program + phase evaluation.
    pub fn core_tick(
        &mut self,
        now_ms: u32,
        hw: &mut impl HardwarePort,
        sink: &mut impl EventSink,
    ) {
        let before = self.program.telemetry();

        let ticked = self.phase.tick(now_ms, &before, hw, &mut self.program);
        if let Some(ev) = ticked {
            sink.emit(&AppEvent::Phase(ev));
        }

        // A completion may have ended the run; settle now, not next sample.
        let after = self.program.telemetry();
        if let Some(ev) = self.phase.sync(now_ms, &after, hw) {
            sink.emit(&AppEvent::Phase(ev));
        }
        self.emit_program_change(before, sink);

        if let Some((voltage_v, current_a)) = self.phase.last_sample() {
            if voltage_v.is_nan() || current_a.is_nan() {
                warn!("sensor read NaN: U={} I={}", voltage_v, current_a);
                sink.emit(&AppEvent::SensorFault {
                    voltage_v,
                    current_a,
                });
            }
            sink.emit(&AppEvent::Telemetry(
                self.snapshot(now_ms, voltage_v, current_a),
            ));
        }
    }

    /// Sample and append one measurement row.
    pub fn store_row(
        &mut self,
        hw: &mut impl MeasurePort,
        log: &SharedRingLog,
        sink: &mut impl EventSink,
    ) {
        let row = [
            Value::U32(self.uptime_s()),
            Value::U16(self.phase.cycle_index_1_based()),
            Value::U8(self.phase.phase().code()),
            Value::U8(self.phase.run_state().code()),
            Value::F32(hw.read_voltage_v()),
            Value::F32(hw.read_current_a()),
            Value::F32(self.phase.phase_energy_wh()),
        ];

        match log.with(|l| l.store(&row).map(|()| (l.len(), l.capacity()))) {
            Ok((rows, capacity)) => sink.emit(&AppEvent::RowStored { rows, capacity }),
            Err(e) => {
                warn!("ring log rejected row: {}", e);
                sink.emit(&AppEvent::RowRejected(e));
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.  Only `SetProgram` can fail.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        hw: &mut impl OutputPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let before = self.program.telemetry();

        match cmd {
            AppCommand::Start => {
                if !self.program.is_idle() {
                    // Restart: drop the old run's phase state first.
                    self.phase.stop(hw);
                }
                self.program.command(CommandType::Start, hw);
            }
            AppCommand::Stop => self.program.command(CommandType::Stop, hw),
            AppCommand::ResetError => self.program.command(CommandType::ResetError, hw),
            AppCommand::Fault => self.program.notify_error(hw),
            AppCommand::Pause => {
                if self.phase.pause(hw) {
                    sink.emit(&AppEvent::Paused(self.phase.phase()));
                } else {
                    warn!("pause ignored in {:?}", self.phase.run_state());
                }
            }
            AppCommand::Resume => {
                if self.phase.resume() {
                    sink.emit(&AppEvent::Resumed(self.phase.phase()));
                } else {
                    warn!("resume ignored in {:?}", self.phase.run_state());
                }
            }
            AppCommand::SetProgram(program) => {
                if !self.program.is_idle() {
                    return Err(ApiError::NotIdle.into());
                }
                self.program.set_program(program);
                self.config.program = self.program.program();
                info!("program updated: {:?}", self.config.program);
                sink.emit(&AppEvent::ProgramUpdated);
            }
            AppCommand::SetPhaseConfig(phase) => {
                self.phase.set_config(phase);
                self.config.phase = phase;
                info!("phase config updated: {:?}", phase);
                sink.emit(&AppEvent::PhaseConfigUpdated);
            }
        }

        let after = self.program.telemetry();
        if let Some(ev) = self.phase.sync(now_ms, &after, hw) {
            sink.emit(&AppEvent::Phase(ev));
        }
        self.emit_program_change(before, sink);
        Ok(())
    }

    /// Empty the measurement history.
    pub fn clear_log(&self, log: &SharedRingLog, sink: &mut impl EventSink) {
        log.clear();
        info!("ring log cleared");
        sink.emit(&AppEvent::LogCleared);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Status as of `now_ms`, with fresh voltage and current reads.
    pub fn status(&self, now_ms: u32, hw: &mut impl MeasurePort) -> TelemetryData {
        let voltage_v = hw.read_voltage_v();
        let current_a = hw.read_current_a();
        self.snapshot(now_ms, voltage_v, current_a)
    }

    pub fn telemetry(&self) -> Telemetry {
        self.program.telemetry()
    }

    pub fn program(&self) -> Program {
        self.program.program()
    }

    pub fn phase_config(&self) -> PhaseConfig {
        self.phase.config()
    }

    pub fn phase_controller(&self) -> &PhaseController {
        &self.phase
    }

    pub fn mode(&self) -> Mode {
        self.program.mode()
    }

    pub fn is_idle(&self) -> bool {
        self.program.is_idle()
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.config.clone()
    }

    /// Whole seconds since the first `poll`.
    pub fn uptime_s(&self) -> u32 {
        (self.uptime_ms / 1000) as u32
    }

    // ── Internal ──────────────────────────────────────────────

    fn due(last: Option<u32>, now_ms: u32, interval_s: u32) -> bool {
        last.is_none_or(|last| has_elapsed(now_ms, last, interval_s))
    }

    fn advance_uptime(&mut self, now_ms: u32) {
        if let Some(prev) = self.last_seen_ms {
            self.uptime_ms += u64::from(elapsed_ms(now_ms, prev));
        }
        self.last_seen_ms = Some(now_ms);
    }

    fn snapshot(&self, now_ms: u32, voltage_v: f32, current_a: f32) -> TelemetryData {
        let t = self.program.telemetry();
        TelemetryData {
            mode: t.mode,
            idle_reason: t.idle_reason,
            phase_count: t.phase_count,
            completed_cycles: t.completed_cycles,
            voltage_v,
            current_a,
            run_state: self.phase.run_state(),
            phase: self.phase.phase(),
            cycle: self.phase.cycle_index_1_based(),
            phase_energy_wh: self.phase.phase_energy_wh(),
            phase_elapsed_s: self.phase.phase_elapsed_s(now_ms),
            uptime_s: self.uptime_s(),
        }
    }

    fn emit_program_change(&self, before: Telemetry, sink: &mut impl EventSink) {
        let after = self.program.telemetry();
        if after.mode == before.mode && after.idle_reason == before.idle_reason {
            return;
        }
        sink.emit(&AppEvent::ModeChanged {
            from: before.mode,
            to: after.mode,
            reason: after.idle_reason,
        });
        if before.mode != Mode::Idle && after.mode == Mode::Idle {
            sink.emit(&AppEvent::RunFinished {
                reason: after.idle_reason,
                phase_count: after.phase_count,
                completed_cycles: after.completed_cycles,
            });
        }
    }
}
