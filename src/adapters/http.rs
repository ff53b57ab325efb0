//! HTTP control surface on the ESP-IDF server.
//!
//! Routes are thin: each one locks the [`Station`], hands the request body
//! to [`crate::api`] and writes back what it returns.  The ring log is
//! shared separately so a download never waits on the station lock.
//!
//! | Route            | Method | Response                          |
//! |------------------|--------|-----------------------------------|
//! | `/`              | GET    | embedded UI page                  |
//! | `/api/status`    | GET    | status JSON                       |
//! | `/api/control`   | POST   | `OK` / 400                        |
//! | `/api/config`    | GET    | config JSON                       |
//! | `/api/config`    | POST   | `OK` / 400 / 409 while running    |
//! | `/api/log/clear` | POST   | `OK`                              |
//! | `/download`      | GET    | CSV with exact `Content-Length`   |
//! | `/favicon.ico`   | GET    | 204                               |

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use esp_idf_svc::http::Method;
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use esp_idf_svc::io::{Read, Write};
use log::{debug, info, warn};

use crate::adapters::log_sink::LogEventSink;
use crate::adapters::time::MonotonicClock;
use crate::api::{self, ConfigPatch};
use crate::app::ports::HardwarePort;
use crate::app::service::AppService;
use crate::error::{ApiError, Error};
use crate::ringlog::SharedRingLog;

const INDEX_HTML: &str = include_str!("index.html");

/// Bytes buffered before a write to the socket during a download.
const STREAM_CHUNK: usize = 512;

/// Everything the driver loop and the handlers both mutate.
pub struct Station<H> {
    pub app: AppService,
    pub hw: H,
    pub sink: LogEventSink,
}

pub type SharedStation<H> = Arc<Mutex<Station<H>>>;

fn lock<H>(station: &SharedStation<H>) -> Result<MutexGuard<'_, Station<H>>> {
    station.lock().map_err(|_| anyhow!("station lock poisoned"))
}

/// Start the server and register every route.  The returned server must
/// be kept alive.
pub fn serve<H>(
    station: SharedStation<H>,
    log: Arc<SharedRingLog>,
    port: u16,
) -> Result<EspHttpServer<'static>>
where
    H: HardwarePort + Send + 'static,
{
    let mut server = EspHttpServer::new(&Configuration {
        http_port: port,
        ..Default::default()
    })?;

    server.fn_handler("/", Method::Get, |req| -> Result<()> {
        req.into_response(200, None, &[("Content-Type", "text/html; charset=utf-8")])?
            .write_all(INDEX_HTML.as_bytes())?;
        Ok(())
    })?;

    server.fn_handler("/favicon.ico", Method::Get, |req| -> Result<()> {
        req.into_status_response(204)?;
        Ok(())
    })?;

    let st = station.clone();
    server.fn_handler("/api/status", Method::Get, move |req| -> Result<()> {
        let body = {
            let mut guard = lock(&st)?;
            let s = &mut *guard;
            api::status_json(&s.app.status(now_ms(), &mut s.hw))
        };
        send_json(req, &body)
    })?;

    let st = station.clone();
    server.fn_handler("/api/control", Method::Post, move |mut req| -> Result<()> {
        let mut buf = [0u8; api::MAX_BODY_BYTES];
        let n = read_body(&mut req, &mut buf)?;
        let outcome = api::parse_control(&buf[..n]).map_err(Error::from).and_then(|cmd| {
            info!("HTTP | control {:?}", cmd);
            let mut guard = lock(&st).map_err(|_| Error::Init("station lock poisoned"))?;
            let s = &mut *guard;
            s.app.handle_command(cmd, now_ms(), &mut s.hw, &mut s.sink)
        });
        send_outcome(req, outcome)
    })?;

    let st = station.clone();
    server.fn_handler("/api/config", Method::Get, move |req| -> Result<()> {
        let body = {
            let guard = lock(&st)?;
            api::config_json(&guard.app.program(), &guard.app.phase_config())
        };
        send_json(req, &body)
    })?;

    let st = station.clone();
    server.fn_handler("/api/config", Method::Post, move |mut req| -> Result<()> {
        let mut buf = [0u8; api::MAX_BODY_BYTES];
        let n = read_body(&mut req, &mut buf)?;
        let outcome = ConfigPatch::parse(&buf[..n]).map_err(Error::from).and_then(|patch| {
            debug!("HTTP | config patch {:?}", patch);
            let mut guard = lock(&st).map_err(|_| Error::Init("station lock poisoned"))?;
            let s = &mut *guard;
            api::apply_config(&mut s.app, &patch, now_ms(), &mut s.hw, &mut s.sink)
        });
        send_outcome(req, outcome)
    })?;

    let st = station;
    let lg = log.clone();
    server.fn_handler("/api/log/clear", Method::Post, move |req| -> Result<()> {
        {
            let mut guard = lock(&st)?;
            let s = &mut *guard;
            s.app.clear_log(&lg, &mut s.sink);
        }
        send_outcome(req, Ok(()))
    })?;

    server.fn_handler("/download", Method::Get, move |req| -> Result<()> {
        // One lock across both passes, so the length matches the body.
        log.with(|l| -> Result<()> {
            let len = l.export_len();
            let len_str = len.to_string();
            let mut resp = req.into_response(
                200,
                None,
                &[
                    ("Content-Type", api::CONTENT_TYPE_CSV),
                    ("Content-Disposition", api::CONTENT_DISPOSITION),
                    ("Content-Length", &len_str),
                ],
            )?;
            let mut out = ChunkWriter::new(&mut resp);
            if l.export(&mut out).is_err() {
                return Err(out.take_error());
            }
            out.flush()?;
            info!("HTTP | download {} rows, {} bytes", l.len(), len);
            Ok(())
        })
    })?;

    info!("HTTP | listening on port {}", port);
    Ok(server)
}

fn now_ms() -> u32 {
    MonotonicClock::new().now_ms()
}

fn read_body(req: &mut Request<&mut EspHttpConnection<'_>>, buf: &mut [u8]) -> Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        let r = req.read(&mut buf[n..])?;
        if r == 0 {
            break;
        }
        n += r;
    }
    Ok(n)
}

fn send_json(req: Request<&mut EspHttpConnection<'_>>, body: &str) -> Result<()> {
    req.into_response(200, None, &[("Content-Type", api::CONTENT_TYPE_JSON)])?
        .write_all(body.as_bytes())?;
    Ok(())
}

fn send_outcome(req: Request<&mut EspHttpConnection<'_>>, outcome: crate::error::Result<()>) -> Result<()> {
    let (status, text) = match outcome {
        Ok(()) => (200, String::from("OK")),
        Err(e) => {
            warn!("HTTP | request rejected: {}", e);
            let status = match e {
                Error::Api(ApiError::NotIdle) => 409,
                Error::Api(_) => 400,
                _ => 500,
            };
            (status, e.to_string())
        }
    };
    req.into_response(status, None, &[("Content-Type", "text/plain")])?
        .write_all(text.as_bytes())?;
    Ok(())
}

/// `fmt::Write` over the response, batching small cell writes.
struct ChunkWriter<'a, W: Write> {
    inner: &'a mut W,
    buf: heapless::Vec<u8, STREAM_CHUNK>,
    error: Option<anyhow::Error>,
}

impl<'a, W: Write> ChunkWriter<'a, W>
where
    W::Error: std::error::Error + Send + Sync + 'static,
{
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            buf: heapless::Vec::new(),
            error: None,
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    fn take_error(&mut self) -> anyhow::Error {
        self.error.take().unwrap_or_else(|| anyhow!("export formatting failed"))
    }
}

impl<W: Write> core::fmt::Write for ChunkWriter<'_, W>
where
    W::Error: std::error::Error + Send + Sync + 'static,
{
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for &b in s.as_bytes() {
            if self.buf.is_full() {
                if let Err(e) = self.flush() {
                    self.error = Some(e);
                    return Err(core::fmt::Error);
                }
            }
            // Cannot fail: just flushed if full.
            let _ = self.buf.push(b);
        }
        Ok(())
    }
}
