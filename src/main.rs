//! BattCycler Firmware — Main Entry Point
//!
//! Composition root: builds the adapters, hands them to the [`AppService`]
//! and runs the single-threaded driver loop.  The HTTP server runs in its
//! own task and reaches the same state through the station mutex.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   MonotonicClock            │
//! │  (Output+Measure)     (EventSink)    (wrapping ms)             │
//! │  WiFi · mDNS · HTTP control surface                            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Program SM · PhaseController · ring log cadence       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use battcycler::adapters::hardware::HardwareAdapter;
use battcycler::adapters::http::{self, Station};
use battcycler::adapters::log_sink::LogEventSink;
use battcycler::adapters::mdns::MdnsAdapter;
use battcycler::adapters::time::MonotonicClock;
use battcycler::adapters::wifi;
use battcycler::app::service::AppService;
use battcycler::config::SystemConfig;
use battcycler::drivers::relay::{Relay, RelayPair};
use battcycler::drivers::watchdog::Watchdog;
use battcycler::pins;
use battcycler::ringlog::schema::MEASUREMENT_SCHEMA;
use battcycler::ringlog::{RingLog, SharedRingLog};
use battcycler::sensors::SensorBackend;
use battcycler::sensors::adc::OneshotAdc;

/// Driver loop period.  The service decides what is due each pass.
const LOOP_PERIOD_MS: u32 = 100;

type RelayPin = PinDriver<'static, AnyOutputPin, Output>;

fn relay_pin(gpio: Option<i32>) -> Result<Option<RelayPin>> {
    gpio.map(|n| {
        // SAFETY: relay GPIOs come from config and are claimed exactly once.
        PinDriver::output(unsafe { AnyOutputPin::new(n) })
    })
    .transpose()
    .map_err(Into::into)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BattCycler v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Outputs: off before anything else runs ─────────────
    let hw_cfg = &config.hardware;
    let relays = RelayPair::new(
        Relay::new(relay_pin(hw_cfg.charge_pin)?, hw_cfg.charge_active_high),
        Relay::new(relay_pin(hw_cfg.discharge_pin)?, hw_cfg.discharge_active_high),
    );

    // ── 3. Measurement path ───────────────────────────────────
    let ina = &hw_cfg.ina219;
    // SAFETY: I2C GPIOs come from config and are claimed exactly once.
    let (sda, scl) = unsafe { (AnyIOPin::new(ina.sda_pin), AnyIOPin::new(ina.scl_pin)) };
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    )?;

    let adc = match OneshotAdc::new() {
        Ok(adc) => Some(adc),
        Err(e) => {
            warn!("ADC unavailable ({}), fallback channels read NaN", e);
            None
        }
    };

    let sensor = SensorBackend::select(hw_cfg, config.sim, i2c, adc);
    let hw = HardwareAdapter::new(relays, sensor);
    info!("Measurement backend: {:?}", hw.sensor_kind());

    // ── 4. Core ───────────────────────────────────────────────
    let log = Arc::new(SharedRingLog::new(RingLog::new(
        &MEASUREMENT_SCHEMA,
        config.log_ram_bytes,
    )));

    let station = Arc::new(Mutex::new(Station {
        app: AppService::new(config.clone()),
        hw,
        sink: LogEventSink::new(),
    }));
    {
        let mut guard = station.lock().map_err(|_| anyhow!("station lock poisoned"))?;
        let s = &mut *guard;
        s.app.start(&mut s.hw, &log, &mut s.sink);
    }

    // ── 5. Network ────────────────────────────────────────────
    let wifi_link = match wifi::start(peripherals.modem, sysloop, nvs, &config.net) {
        Ok(w) => w,
        Err(e) => {
            warn!("WiFi bring-up failed ({}), running without network", e);
            None
        }
    };

    let mut mdns = MdnsAdapter::new(config.net.hostname.clone(), config.net.http_port);
    if wifi_link.is_some() {
        mdns.start();
    }

    let _server = http::serve(station.clone(), log.clone(), config.net.http_port)?;

    // ── 6. Driver loop ────────────────────────────────────────
    let clock = MonotonicClock::new();
    let watchdog = Watchdog::default();
    info!("System ready. Entering driver loop.");

    loop {
        {
            let mut guard = station.lock().map_err(|_| anyhow!("station lock poisoned"))?;
            let s = &mut *guard;
            s.app.poll(clock.now_ms(), &mut s.hw, &log, &mut s.sink);
        }
        watchdog.feed();
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
