//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! One line per event, prefixed by its subsystem so a serial capture can
//! be grepped: `MODE |`, `PHASE |`, `DONE |`, `TELEM |`, `LOG |`.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::phase::PhaseEvent;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { log_capacity } => {
                info!("START | ring log capacity={} rows", log_capacity);
            }
            AppEvent::ModeChanged { from, to, reason } => {
                info!("MODE | {:?} -> {:?} ({:?})", from, to, reason);
            }
            AppEvent::RunFinished {
                reason,
                phase_count,
                completed_cycles,
            } => {
                info!(
                    "DONE | reason={:?} phases={} cycles={}",
                    reason, phase_count, completed_cycles
                );
            }
            AppEvent::Phase(ev) => match ev {
                PhaseEvent::Started { phase } => info!("PHASE | run picked up in {:?}", phase),
                PhaseEvent::Completed {
                    phase,
                    energy_wh,
                    elapsed_s,
                    phase_count,
                } => info!(
                    "PHASE | {:?} complete | {:.4} Wh in {} s | phaseCount={}",
                    phase, energy_wh, elapsed_s, phase_count
                ),
                PhaseEvent::Entered { phase } => info!("PHASE | enter {:?}", phase),
                PhaseEvent::Stopped => info!("PHASE | stopped"),
            },
            AppEvent::Paused(phase) => info!("PHASE | paused in {:?}", phase),
            AppEvent::Resumed(phase) => info!("PHASE | resumed in {:?}", phase),
            AppEvent::SensorFault {
                voltage_v,
                current_a,
            } => {
                warn!("TELEM | sensor fault U={} I={}", voltage_v, current_a);
            }
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | {:?}/{:?} | {:?} cycle={} | U={:.3}V I={:.3}A | \
                     E={:.4}Wh t={}s | phases={} cycles={}",
                    t.mode,
                    t.idle_reason,
                    t.phase,
                    t.cycle,
                    t.voltage_v,
                    t.current_a,
                    t.phase_energy_wh,
                    t.phase_elapsed_s,
                    t.phase_count,
                    t.completed_cycles,
                );
            }
            AppEvent::RowStored { rows, capacity } => {
                debug!("LOG | row stored ({}/{})", rows, capacity);
            }
            AppEvent::RowRejected(e) => warn!("LOG | row rejected: {}", e),
            AppEvent::LogCleared => info!("LOG | cleared"),
            AppEvent::ProgramUpdated => info!("MODE | program updated"),
            AppEvent::PhaseConfigUpdated => info!("PHASE | config updated"),
        }
    }
}
