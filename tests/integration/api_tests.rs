//! Integration tests: control surface bodies in, service state and
//! response bodies out.

use battcycler::api::{self, ConfigPatch};
use battcycler::app::service::AppService;
use battcycler::config::SystemConfig;
use battcycler::error::{ApiError, Error};
use battcycler::phase::Phase;
use battcycler::program::{Mode, Program};
use battcycler::ringlog::schema::{MEASUREMENT_SCHEMA, row_width};
use battcycler::ringlog::{RingLog, SharedRingLog};

use crate::mock_hw::{MockHardware, RecordingSink};

fn setup() -> (AppService, MockHardware, SharedRingLog, RecordingSink) {
    let config = SystemConfig {
        core_sample_interval_s: 1,
        log_store_interval_s: 1,
        ..SystemConfig::default()
    };
    let log = SharedRingLog::new(RingLog::new(&MEASUREMENT_SCHEMA, 64 * row_width(&MEASUREMENT_SCHEMA)));
    (
        AppService::new(config),
        MockHardware::new(12.8),
        log,
        RecordingSink::new(),
    )
}

fn post_control(
    app: &mut AppService,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
    body: &str,
) -> Result<(), Error> {
    let cmd = api::parse_control(body.as_bytes())?;
    app.handle_command(cmd, 0, hw, sink)
}

fn status(app: &AppService, hw: &mut MockHardware) -> serde_json::Value {
    serde_json::from_str(&api::status_json(&app.status(0, hw))).unwrap()
}

#[test]
fn start_shows_in_status_immediately() {
    let (mut app, mut hw, _log, mut sink) = setup();
    post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"start"}"#).unwrap();

    let s = status(&app, &mut hw);
    assert_eq!(s["mode"], Mode::Charge as u8);
    assert_eq!(s["runState"], 1);
    assert_eq!(s["phase"], Phase::Charge.code());
    assert_eq!(s["cycle"], 1);
    assert_eq!(s["voltage_V"], 12.8);
}

#[test]
fn stop_then_status_reports_stopped() {
    let (mut app, mut hw, _log, mut sink) = setup();
    post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"start"}"#).unwrap();
    post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"stop"}"#).unwrap();

    let s = status(&app, &mut hw);
    assert_eq!(s["mode"], 0);
    assert_eq!(s["idleReason"], 3);
    assert_eq!(s["runState"], 0);
    assert_eq!(s["cycle"], 0);
}

#[test]
fn unknown_command_changes_nothing() {
    let (mut app, mut hw, _log, mut sink) = setup();
    let err = post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"boost"}"#);
    assert_eq!(err, Err(Error::Api(ApiError::UnknownCommand)));
    assert!(app.is_idle());
    assert!(hw.calls.is_empty());
}

#[test]
fn config_round_trips_through_the_surface() {
    let (mut app, mut hw, _log, mut sink) = setup();
    let body = br#"{
        "cycles": 3,
        "startMode": "discharge",
        "stopMode": "charge",
        "chargeStopVoltage_V": 14.4,
        "chargeStopHold_s": 1800,
        "waitChargeToDischarge_s": 30,
        "dischargeStopVoltage_V": 11.9,
        "waitDischargeToCharge_s": 45
    }"#;
    let patch = ConfigPatch::parse(body).unwrap();
    api::apply_config(&mut app, &patch, 0, &mut hw, &mut sink).unwrap();

    assert_eq!(
        app.program(),
        Program {
            cycles: 3,
            start_mode: Mode::Discharge,
            stop_mode: Mode::Charge,
        }
    );

    let json: serde_json::Value =
        serde_json::from_str(&api::config_json(&app.program(), &app.phase_config())).unwrap();
    assert_eq!(json["cycles"], 3);
    assert_eq!(json["startMode"], "discharge");
    assert_eq!(json["stopMode"], "charge");
    assert_eq!(json["chargeStopVoltage_V"], 14.4);
    assert_eq!(json["chargeStopHold_s"], 1800);
    assert_eq!(json["waitChargeToDischarge_s"], 30);
    assert_eq!(json["dischargeStopVoltage_V"], 11.9);
    assert_eq!(json["waitDischargeToCharge_s"], 45);
}

#[test]
fn new_program_applies_on_next_start() {
    let (mut app, mut hw, _log, mut sink) = setup();
    let patch = ConfigPatch::parse(br#"{"startMode":"discharge"}"#).unwrap();
    api::apply_config(&mut app, &patch, 0, &mut hw, &mut sink).unwrap();

    post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"start"}"#).unwrap();
    assert_eq!(app.mode(), Mode::Discharge);
    assert_eq!(app.phase_controller().phase(), Phase::Discharge);
}

#[test]
fn running_program_patch_is_rejected_whole() {
    let (mut app, mut hw, _log, mut sink) = setup();
    post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"start"}"#).unwrap();
    let before = app.phase_config();

    let patch = ConfigPatch::parse(br#"{"cycles":5,"chargeStopHold_s":60}"#).unwrap();
    let res = api::apply_config(&mut app, &patch, 0, &mut hw, &mut sink);
    assert_eq!(res, Err(Error::Api(ApiError::NotIdle)));
    assert_eq!(app.phase_config(), before);
    assert_eq!(app.program().cycles, 1);
}

#[test]
fn missing_and_malformed_bodies() {
    assert_eq!(ConfigPatch::parse(b""), Err(ApiError::MissingBody));
    assert_eq!(ConfigPatch::parse(b"{cycles:2}"), Err(ApiError::MalformedBody));
    assert_eq!(api::parse_control(b""), Err(ApiError::MissingBody));
}

#[test]
fn download_matches_logged_rows() {
    let (mut app, mut hw, log, mut sink) = setup();
    post_control(&mut app, &mut hw, &mut sink, r#"{"cmd":"start"}"#).unwrap();
    for t in 0..5u32 {
        app.poll(t * 1_000, &mut hw, &log, &mut sink);
    }

    let mut body = String::new();
    api::export_csv(&log, &mut body).unwrap();
    assert_eq!(body.len(), api::export_len(&log));
    assert_eq!(body.lines().count(), 1 + 5);
    assert!(body.lines().nth(1).unwrap().starts_with("0,1,0,1,12.8000,"));

    app.clear_log(&log, &mut sink);
    let mut empty = String::new();
    api::export_csv(&log, &mut empty).unwrap();
    assert_eq!(empty, "Time_s,Cycle,Phase,Status,U_V,I_A,Ephase_Wh\n");
    assert_eq!(api::export_len(&log), empty.len());
}
