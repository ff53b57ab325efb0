//! Integration tests: full charge/discharge runs driven through
//! `AppService::poll` against a modelled battery.

use battcycler::app::commands::AppCommand;
use battcycler::app::events::AppEvent;
use battcycler::app::ports::OutputPort;
use battcycler::app::service::AppService;
use battcycler::config::SystemConfig;
use battcycler::phase::{Phase, PhaseConfig, PhaseEvent, RunState};
use battcycler::program::{IdleReason, Mode, Program};
use battcycler::ringlog::schema::{COL_CYCLE, COL_PHASE, COL_TIME, MEASUREMENT_SCHEMA, Value};
use battcycler::ringlog::{RingLog, SharedRingLog};

use crate::mock_hw::{MockHardware, OutputCall, RecordingSink};

const RATE_V_PER_S: f32 = 0.02;
const V_MIN: f32 = 11.0;
const V_MAX: f32 = 14.6;

fn bench_config() -> SystemConfig {
    SystemConfig {
        core_sample_interval_s: 1,
        log_store_interval_s: 30,
        log_ram_bytes: 20 * 1000,
        phase: PhaseConfig {
            charge_stop_voltage_v: 14.5,
            charge_hold_above_s: 60,
            wait_charge_to_discharge_s: 10,
            discharge_stop_voltage_v: 12.2,
            wait_discharge_to_charge_s: 10,
        },
        ..SystemConfig::default()
    }
}

struct Bench {
    app: AppService,
    hw: MockHardware,
    log: SharedRingLog,
    sink: RecordingSink,
    now_ms: u32,
}

impl Bench {
    fn new(config: SystemConfig, start_v: f32) -> Self {
        let log = SharedRingLog::new(RingLog::new(&MEASUREMENT_SCHEMA, config.log_ram_bytes));
        let mut bench = Self {
            app: AppService::new(config),
            hw: MockHardware::new(start_v),
            log,
            sink: RecordingSink::new(),
            now_ms: 0,
        };
        bench.app.start(&mut bench.hw, &bench.log, &mut bench.sink);
        bench
    }

    fn command(&mut self, cmd: AppCommand) {
        self.app
            .handle_command(cmd, self.now_ms, &mut self.hw, &mut self.sink)
            .unwrap();
    }

    /// One second of bench time.
    fn step(&mut self) {
        self.app.poll(self.now_ms, &mut self.hw, &self.log, &mut self.sink);
        self.hw.advance(1.0, RATE_V_PER_S, V_MIN, V_MAX);
        self.now_ms = self.now_ms.wrapping_add(1_000);
    }

    /// Step until the program returns to Idle, or `limit_s` passes.
    fn run_to_idle(&mut self, limit_s: u32) {
        for _ in 0..limit_s {
            self.step();
            if self.app.is_idle() {
                return;
            }
        }
        panic!("run did not finish within {limit_s} s");
    }

    fn completions(&self) -> Vec<(Phase, f32)> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Phase(PhaseEvent::Completed {
                    phase, energy_wh, ..
                }) => Some((*phase, *energy_wh)),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn two_cycles_end_on_discharge() {
    let mut b = Bench::new(bench_config(), 13.0);
    b.command(AppCommand::SetProgram(Program {
        cycles: 2,
        start_mode: Mode::Charge,
        stop_mode: Mode::Discharge,
    }));
    b.command(AppCommand::Start);
    b.run_to_idle(4 * 3600);

    let t = b.app.telemetry();
    assert_eq!(t.idle_reason, IdleReason::Done);
    assert_eq!(t.phase_count, 4);
    assert_eq!(t.completed_cycles, 2);
    assert_eq!(b.app.phase_controller().run_state(), RunState::Off);
    assert_eq!(b.app.phase_controller().cycle_index_1_based(), 0);

    let phases: Vec<Phase> = b.completions().iter().map(|(p, _)| *p).collect();
    assert_eq!(
        phases,
        vec![Phase::Charge, Phase::Discharge, Phase::Charge, Phase::Discharge]
    );
    assert!(b.completions()[0].1 > 0.0, "charge phase accumulates energy");

    assert!(!b.hw.interlock_violated);
    assert_eq!(b.hw.last_call(), Some(OutputCall::AllOff));
    // Run start, then the program switch and the wait exit before charge two.
    assert_eq!(b.hw.count(OutputCall::StartCharge), 3);

    assert_eq!(
        b.sink.count(|e| matches!(e, AppEvent::RunFinished { reason: IdleReason::Done, .. })),
        1
    );
}

#[test]
fn stop_mode_charge_needs_an_extra_phase() {
    let mut b = Bench::new(bench_config(), 13.0);
    b.command(AppCommand::SetProgram(Program {
        cycles: 1,
        start_mode: Mode::Charge,
        stop_mode: Mode::Charge,
    }));
    b.command(AppCommand::Start);
    b.run_to_idle(4 * 3600);

    let t = b.app.telemetry();
    assert_eq!(t.idle_reason, IdleReason::Done);
    assert_eq!(t.phase_count, 3);
    assert_eq!(t.completed_cycles, 1);
    assert_eq!(b.completions().last().map(|(p, _)| *p), Some(Phase::Charge));
}

#[test]
fn ring_log_follows_the_run() {
    let mut b = Bench::new(bench_config(), 13.0);
    b.command(AppCommand::Start);
    b.run_to_idle(4 * 3600);

    let rows = b.log.with(|l| l.rows().collect::<Vec<_>>());
    assert!(rows.len() >= 5);

    let times: Vec<u32> = rows
        .iter()
        .map(|r| match r[COL_TIME] {
            Value::U32(t) => t,
            other => panic!("time column holds {other:?}"),
        })
        .collect();
    assert!(times.windows(2).all(|w| w[1] - w[0] == 30));

    let saw = |code: u8| rows.iter().any(|r| r[COL_PHASE] == Value::U8(code));
    assert!(saw(Phase::Charge.code()));
    assert!(saw(Phase::Discharge.code()));
    assert!(rows.iter().all(|r| matches!(r[COL_CYCLE], Value::U16(0..=2))));
}

#[test]
fn stop_mid_run_then_restart_counts_from_zero() {
    let mut b = Bench::new(bench_config(), 13.0);
    b.command(AppCommand::Start);
    for _ in 0..120 {
        b.step();
    }
    assert_eq!(b.app.mode(), Mode::Charge);

    b.command(AppCommand::Stop);
    assert_eq!(b.app.telemetry().idle_reason, IdleReason::Stopped);
    assert_eq!(b.app.phase_controller().run_state(), RunState::Off);
    assert_eq!(b.hw.last_call(), Some(OutputCall::AllOff));

    b.command(AppCommand::Start);
    assert_eq!(b.app.mode(), Mode::Charge);
    assert_eq!(b.app.telemetry().phase_count, 0);
    assert_eq!(b.app.phase_controller().cycle_index_1_based(), 1);
    b.run_to_idle(4 * 3600);
    assert_eq!(b.app.telemetry().idle_reason, IdleReason::Done);
}

#[test]
fn pause_holds_the_phase_and_outputs_off() {
    let mut b = Bench::new(bench_config(), 13.0);
    b.command(AppCommand::Start);
    for _ in 0..20 {
        b.step();
    }
    let v_before = b.hw.voltage;

    b.command(AppCommand::Pause);
    assert_eq!(b.app.phase_controller().run_state(), RunState::Paused);
    assert!(!b.hw.is_charge_on());
    for _ in 0..600 {
        b.step();
    }
    assert_eq!(b.hw.voltage, v_before, "no output, no drift");
    assert_eq!(b.app.phase_controller().phase(), Phase::Charge);

    b.command(AppCommand::Resume);
    b.step();
    assert_eq!(b.app.phase_controller().run_state(), RunState::Running);
    assert!(b.hw.is_charge_on());
}

#[test]
fn fault_mid_run_latches_error() {
    let mut b = Bench::new(bench_config(), 13.0);
    b.command(AppCommand::Start);
    for _ in 0..5 {
        b.step();
    }
    b.command(AppCommand::Fault);
    assert_eq!(b.app.telemetry().idle_reason, IdleReason::Error);
    for _ in 0..60 {
        b.step();
    }
    assert_eq!(b.app.telemetry().idle_reason, IdleReason::Error);
    assert_eq!(b.app.phase_controller().run_state(), RunState::Off);

    b.command(AppCommand::ResetError);
    assert_eq!(b.app.telemetry().idle_reason, IdleReason::Ready);
}

#[test]
fn sensor_dropout_stalls_charge() {
    let mut b = Bench::new(bench_config(), 14.6);
    // Reads at t=0: core tick, then the first log row.  Dropout covers the
    // core ticks at 1..=3 s, after which the reading settles at 14.6 V.
    b.hw.script = [14.6, 14.6, f32::NAN, f32::NAN, f32::NAN, 14.6]
        .into_iter()
        .collect();
    b.command(AppCommand::Start);
    for _ in 0..5 {
        b.step();
    }
    assert_eq!(b.app.phase_controller().phase(), Phase::Charge);
    assert_eq!(b.sink.count(|e| matches!(e, AppEvent::SensorFault { .. })), 3);

    // Above threshold since t=0, but the dropout restarted the hold at t=4.
    for _ in 5..62 {
        b.step();
    }
    assert_eq!(b.app.phase_controller().phase(), Phase::Charge);
    assert!(b.completions().is_empty());

    for _ in 62..65 {
        b.step();
    }
    assert_eq!(b.completions().len(), 1);
    assert_eq!(b.completions()[0].0, Phase::Charge);
}
