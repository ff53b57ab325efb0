//! Program state machine — top-level mode and cycle/stop policy.
//!
//! ```text
//!            Start (startMode)
//!   IDLE(reason) ───────────────▶ CHARGE ◀──────┐
//!      ▲    ▲                       │ phase done │ phase done
//!      │    │                       ▼            │ (target not met)
//!      │    └───────────────────  DISCHARGE ─────┘
//!      │     target met AND finished == stopMode → IDLE(Done)
//!      │
//!      └── Stop → IDLE(Stopped) · ResetError → IDLE(Ready) · Error → IDLE(Error)
//! ```
//!
//! Every path into Idle forces the outputs off first.  The program is
//! snapshotted on Start, so a `set_program` during a run only takes effect
//! on the next Start.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{OutputPort, PhaseObserver};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Top-level program mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mode {
    #[default]
    Idle = 0,
    Charge = 1,
    Discharge = 2,
}

impl Mode {
    /// Charge ↔ Discharge; Idle maps to itself.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Charge => Self::Discharge,
            Self::Discharge => Self::Charge,
            Self::Idle => Self::Idle,
        }
    }
}

/// Why the program sits in Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum IdleReason {
    /// Fresh boot, cleared error, or running.
    #[default]
    Ready = 0,
    /// Program finished normally.
    Done = 1,
    /// Safety or hardware error.
    Error = 2,
    /// User stop.
    Stopped = 3,
}

/// Run parameters.  Only meaningful while Idle; `cycles` never drops below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub cycles: u16,
    pub start_mode: Mode,
    pub stop_mode: Mode,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            cycles: 1,
            start_mode: Mode::Charge,
            stop_mode: Mode::Discharge,
        }
    }
}

/// External commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Start,
    Stop,
    ResetError,
}

/// Read-only snapshot of program progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Telemetry {
    pub mode: Mode,
    pub idle_reason: IdleReason,
    /// Finished active phases (never waits).
    pub phase_count: u16,
    /// `phase_count / 2`.
    pub completed_cycles: u16,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub struct ProgramStateMachine {
    program: Program,
    /// Program in force for the current run.
    active: Program,
    telemetry: Telemetry,
}

impl Default for ProgramStateMachine {
    fn default() -> Self {
        Self::new(Program::default())
    }
}

impl ProgramStateMachine {
    /// Starts in Idle(Ready).
    pub fn new(program: Program) -> Self {
        let mut sm = Self {
            program: Program::default(),
            active: Program::default(),
            telemetry: Telemetry::default(),
        };
        sm.set_program(program);
        sm.active = sm.program;
        sm
    }

    /// Store run parameters, clamping `cycles` to at least 1.
    pub fn set_program(&mut self, program: Program) {
        self.program = program;
        if self.program.cycles < 1 {
            self.program.cycles = 1;
        }
        if self.telemetry.mode != Mode::Idle {
            warn!("SM: program updated mid-run, applies from next start");
        }
    }

    pub fn command(&mut self, cmd: CommandType, hw: &mut impl OutputPort) {
        info!("SM: cmd={:?}", cmd);
        match cmd {
            CommandType::Start => {
                self.active = self.program;
                self.telemetry.phase_count = 0;
                self.telemetry.completed_cycles = 0;
                self.telemetry.idle_reason = IdleReason::Ready;
                self.enter_mode(self.active.start_mode, hw);
            }
            CommandType::Stop => {
                hw.all_off();
                self.enter_idle(IdleReason::Stopped);
            }
            CommandType::ResetError => {
                hw.all_off();
                self.enter_idle(IdleReason::Ready);
            }
        }
    }

    /// The current active phase finished.  Counts it, stops its output and
    /// either ends the run or switches to the opposite mode.
    pub fn notify_phase_done(&mut self, hw: &mut impl OutputPort) {
        let finished = self.telemetry.mode;
        if finished == Mode::Idle {
            warn!("SM: phase done while idle, ignored");
            return;
        }

        self.telemetry.phase_count = self.telemetry.phase_count.saturating_add(1);
        self.telemetry.completed_cycles = self.telemetry.phase_count / 2;
        info!(
            "SM: phase done in {:?}, phaseCount={} completedCycles={}",
            finished, self.telemetry.phase_count, self.telemetry.completed_cycles
        );

        match finished {
            Mode::Charge => hw.stop_charge(),
            Mode::Discharge => hw.stop_discharge(),
            Mode::Idle => {}
        }

        if self.should_stop_after(finished) {
            hw.all_off();
            self.enter_idle(IdleReason::Done);
            return;
        }

        self.enter_mode(finished.opposite(), hw);
    }

    /// Safety shutdown.  Wins over any transition in progress.
    pub fn notify_error(&mut self, hw: &mut impl OutputPort) {
        error!("SM: error -> shutdown");
        hw.all_off();
        self.enter_idle(IdleReason::Error);
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    pub fn program(&self) -> Program {
        self.program
    }

    pub fn mode(&self) -> Mode {
        self.telemetry.mode
    }

    pub fn is_idle(&self) -> bool {
        self.telemetry.mode == Mode::Idle
    }

    // ── Internal ──────────────────────────────────────────────

    fn enter_idle(&mut self, reason: IdleReason) {
        info!("SM: enter Idle reason={:?}", reason);
        self.telemetry.mode = Mode::Idle;
        self.telemetry.idle_reason = reason;
    }

    fn enter_mode(&mut self, mode: Mode, hw: &mut impl OutputPort) {
        info!("SM: enter mode={:?}", mode);
        self.telemetry.mode = mode;
        self.telemetry.idle_reason = IdleReason::Ready;
        match mode {
            Mode::Charge => hw.start_charge(),
            Mode::Discharge => hw.start_discharge(),
            Mode::Idle => hw.all_off(),
        }
    }

    /// Stop only once the cycle target is met *and* the finished phase is
    /// the configured stop mode, so a run always ends on `stop_mode`.
    fn should_stop_after(&self, finished: Mode) -> bool {
        self.telemetry.completed_cycles >= self.active.cycles && finished == self.active.stop_mode
    }
}

impl PhaseObserver for ProgramStateMachine {
    fn phase_done(&mut self, hw: &mut impl OutputPort) {
        self.notify_phase_done(hw);
    }
}
