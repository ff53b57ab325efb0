//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (HTTP control
//! surface, serial console, a safety supervisor) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::phase::PhaseConfig;
use crate::program::Program;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Begin a run in the program's start mode.  Restarts a run in progress.
    Start,

    /// User stop: outputs off, Idle(Stopped).
    Stop,

    /// Outputs off, phase state kept.
    Pause,

    /// Continue a paused phase.
    Resume,

    /// Leave Idle(Error) for Idle(Ready).
    ResetError,

    /// External safety signal: immediate shutdown into Idle(Error).
    Fault,

    /// Replace the run parameters.  Rejected while a run is active.
    SetProgram(Program),

    /// Replace stop thresholds and waits.  Applies on the next tick.
    SetPhaseConfig(PhaseConfig),
}
