//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial or record them in a
//! test.

use crate::error::StoreError;
use crate::phase::{Phase, PhaseEvent, RunState};
use crate::program::{IdleReason, Mode};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service is up; the ring log holds `log_capacity` rows.
    Started { log_capacity: usize },

    /// Program mode or idle reason changed.
    ModeChanged {
        from: Mode,
        to: Mode,
        reason: IdleReason,
    },

    /// A run left the active modes.
    RunFinished {
        reason: IdleReason,
        phase_count: u16,
        completed_cycles: u16,
    },

    /// Phase controller transition.
    Phase(PhaseEvent),

    Paused(Phase),
    Resumed(Phase),

    /// A sample came back NaN; the running phase cannot complete.
    SensorFault { voltage_v: f32, current_a: f32 },

    /// Per-sample snapshot.
    Telemetry(TelemetryData),

    RowStored { rows: usize, capacity: usize },
    RowRejected(StoreError),
    LogCleared,

    ProgramUpdated,
    PhaseConfigUpdated,
}

/// A point-in-time snapshot suitable for logging or the status surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub mode: Mode,
    pub idle_reason: IdleReason,
    pub phase_count: u16,
    pub completed_cycles: u16,
    pub voltage_v: f32,
    pub current_a: f32,

    pub run_state: RunState,
    pub phase: Phase,
    pub cycle: u16,
    pub phase_energy_wh: f32,
    pub phase_elapsed_s: u32,

    pub uptime_s: u32,
}
