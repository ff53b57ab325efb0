//! Control surface contract — the JSON and CSV bodies the HTTP adapter
//! serves, kept transport-free so they can be tested on the host.
//!
//! | Route               | Method | Body                                  |
//! |---------------------|--------|---------------------------------------|
//! | `/api/status`       | GET    | [`status_json`]                       |
//! | `/api/control`      | POST   | `{"cmd": "..."}` → [`parse_control`]  |
//! | `/api/config`       | GET    | [`config_json`]                       |
//! | `/api/config`       | POST   | partial [`ConfigPatch`]               |
//! | `/api/log/clear`    | POST   | none                                  |
//! | `/download`         | GET    | [`export_csv`], length [`export_len`] |

extern crate alloc;

use alloc::string::String;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::commands::AppCommand;
use crate::app::events::TelemetryData;
use crate::app::ports::{EventSink, OutputPort};
use crate::app::service::AppService;
use crate::error::{ApiError, Result};
use crate::phase::PhaseConfig;
use crate::program::{Mode, Program};
use crate::ringlog::SharedRingLog;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_CSV: &str = "text/csv";

macro_rules! download_file_name {
    () => {
        "battery_log.csv"
    };
}

pub const DOWNLOAD_FILE_NAME: &str = download_file_name!();
pub const CONTENT_DISPOSITION: &str =
    concat!("attachment; filename=\"", download_file_name!(), "\"");

/// Largest request body the control surface reads.
pub const MAX_BODY_BYTES: usize = 512;

/// Floats on the status and config surface carry this many decimals.
const JSON_DECIMALS: i32 = 3;

fn round_json(v: f32) -> f64 {
    let scale = 10f64.powi(JSON_DECIMALS);
    (f64::from(v) * scale).round() / scale
}

// ───────────────────────────────────────────────────────────────
// Status
// ───────────────────────────────────────────────────────────────

/// Enum fields are ordinals; NaN readings serialise as `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    mode: u8,
    idle_reason: u8,
    phase_count: u16,
    completed_cycles: u16,
    #[serde(rename = "voltage_V")]
    voltage_v: f64,
    #[serde(rename = "current_A")]
    current_a: f64,
    run_state: u8,
    phase: u8,
    cycle: u16,
    #[serde(rename = "phaseEnergy_Wh")]
    phase_energy_wh: f64,
    #[serde(rename = "phaseElapsed_s")]
    phase_elapsed_s: u32,
}

pub fn status_json(t: &TelemetryData) -> String {
    let body = StatusBody {
        mode: t.mode as u8,
        idle_reason: t.idle_reason as u8,
        phase_count: t.phase_count,
        completed_cycles: t.completed_cycles,
        voltage_v: round_json(t.voltage_v),
        current_a: round_json(t.current_a),
        run_state: t.run_state.code(),
        phase: t.phase.code(),
        cycle: t.cycle,
        phase_energy_wh: round_json(t.phase_energy_wh),
        phase_elapsed_s: t.phase_elapsed_s,
    };
    serde_json::to_string(&body).unwrap_or_default()
}

// ───────────────────────────────────────────────────────────────
// Control
// ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ControlBody {
    cmd: String,
}

pub fn parse_control(body: &[u8]) -> core::result::Result<AppCommand, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingBody);
    }
    let req: ControlBody = serde_json::from_slice(body).map_err(|_| ApiError::MalformedBody)?;
    match req.cmd.as_str() {
        "start" => Ok(AppCommand::Start),
        "stop" => Ok(AppCommand::Stop),
        "pause" => Ok(AppCommand::Pause),
        "resume" => Ok(AppCommand::Resume),
        "resetError" => Ok(AppCommand::ResetError),
        _ => Err(ApiError::UnknownCommand),
    }
}

// ───────────────────────────────────────────────────────────────
// Config
// ───────────────────────────────────────────────────────────────

/// Mode names accepted for `startMode` / `stopMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveMode {
    Charge,
    Discharge,
}

impl From<ActiveMode> for Mode {
    fn from(m: ActiveMode) -> Self {
        match m {
            ActiveMode::Charge => Mode::Charge,
            ActiveMode::Discharge => Mode::Discharge,
        }
    }
}

impl From<Mode> for ActiveMode {
    fn from(m: Mode) -> Self {
        if m == Mode::Discharge {
            Self::Discharge
        } else {
            Self::Charge
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigBody {
    cycles: u16,
    start_mode: ActiveMode,
    stop_mode: ActiveMode,
    #[serde(rename = "chargeStopVoltage_V")]
    charge_stop_voltage_v: f64,
    #[serde(rename = "chargeStopHold_s")]
    charge_stop_hold_s: u32,
    #[serde(rename = "waitChargeToDischarge_s")]
    wait_charge_to_discharge_s: u32,
    #[serde(rename = "dischargeStopVoltage_V")]
    discharge_stop_voltage_v: f64,
    #[serde(rename = "waitDischargeToCharge_s")]
    wait_discharge_to_charge_s: u32,
}

pub fn config_json(program: &Program, phase: &PhaseConfig) -> String {
    let body = ConfigBody {
        cycles: program.cycles,
        start_mode: program.start_mode.into(),
        stop_mode: program.stop_mode.into(),
        charge_stop_voltage_v: round_json(phase.charge_stop_voltage_v),
        charge_stop_hold_s: phase.charge_hold_above_s,
        wait_charge_to_discharge_s: phase.wait_charge_to_discharge_s,
        discharge_stop_voltage_v: round_json(phase.discharge_stop_voltage_v),
        wait_discharge_to_charge_s: phase.wait_discharge_to_charge_s,
    };
    serde_json::to_string(&body).unwrap_or_default()
}

/// Partial config write.  Absent keys keep their current value; counts and
/// durations arrive as JSON numbers and are clamped into range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub cycles: Option<f64>,
    pub start_mode: Option<ActiveMode>,
    pub stop_mode: Option<ActiveMode>,
    #[serde(rename = "chargeStopVoltage_V")]
    pub charge_stop_voltage_v: Option<f32>,
    #[serde(rename = "chargeStopHold_s")]
    pub charge_stop_hold_s: Option<f64>,
    #[serde(rename = "waitChargeToDischarge_s")]
    pub wait_charge_to_discharge_s: Option<f64>,
    #[serde(rename = "dischargeStopVoltage_V")]
    pub discharge_stop_voltage_v: Option<f32>,
    #[serde(rename = "waitDischargeToCharge_s")]
    pub wait_discharge_to_charge_s: Option<f64>,
}

fn clamp_seconds(v: f64) -> u32 {
    v.clamp(0.0, f64::from(u32::MAX)) as u32
}

impl ConfigPatch {
    pub fn parse(body: &[u8]) -> core::result::Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::MissingBody);
        }
        serde_json::from_slice(body).map_err(|_| ApiError::MalformedBody)
    }

    pub fn touches_program(&self) -> bool {
        self.cycles.is_some() || self.start_mode.is_some() || self.stop_mode.is_some()
    }

    pub fn touches_phase(&self) -> bool {
        self.charge_stop_voltage_v.is_some()
            || self.charge_stop_hold_s.is_some()
            || self.wait_charge_to_discharge_s.is_some()
            || self.discharge_stop_voltage_v.is_some()
            || self.wait_discharge_to_charge_s.is_some()
    }

    pub fn apply_program(&self, mut p: Program) -> Program {
        if let Some(c) = self.cycles {
            p.cycles = c.clamp(1.0, f64::from(u16::MAX)) as u16;
        }
        if let Some(m) = self.start_mode {
            p.start_mode = m.into();
        }
        if let Some(m) = self.stop_mode {
            p.stop_mode = m.into();
        }
        p
    }

    pub fn apply_phase(&self, mut c: PhaseConfig) -> PhaseConfig {
        if let Some(v) = self.charge_stop_voltage_v {
            c.charge_stop_voltage_v = v;
        }
        if let Some(s) = self.charge_stop_hold_s {
            c.charge_hold_above_s = clamp_seconds(s);
        }
        if let Some(s) = self.wait_charge_to_discharge_s {
            c.wait_charge_to_discharge_s = clamp_seconds(s);
        }
        if let Some(v) = self.discharge_stop_voltage_v {
            c.discharge_stop_voltage_v = v;
        }
        if let Some(s) = self.wait_discharge_to_charge_s {
            c.wait_discharge_to_charge_s = clamp_seconds(s);
        }
        c
    }
}

/// Apply a patch to the running service.  A patch that touches the program
/// while a run is active is rejected whole, nothing is applied.
pub fn apply_config(
    app: &mut AppService,
    patch: &ConfigPatch,
    now_ms: u32,
    hw: &mut impl OutputPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    if patch.touches_program() {
        if !app.is_idle() {
            return Err(ApiError::NotIdle.into());
        }
        let program = patch.apply_program(app.program());
        app.handle_command(AppCommand::SetProgram(program), now_ms, hw, sink)?;
    }
    if patch.touches_phase() {
        let phase = patch.apply_phase(app.phase_config());
        app.handle_command(AppCommand::SetPhaseConfig(phase), now_ms, hw, sink)?;
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Download
// ───────────────────────────────────────────────────────────────

/// Exact byte length of [`export_csv`], from a counting pass over the
/// same routine.
pub fn export_len(log: &SharedRingLog) -> usize {
    log.with(|l| l.export_len())
}

pub fn export_csv<W: fmt::Write>(log: &SharedRingLog, out: &mut W) -> fmt::Result {
    log.with(|l| l.export(out))
}
