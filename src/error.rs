//! Unified error types for the BattCycler firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! driver loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through events and the control surface without allocation.
//!
//! Sensor faults are deliberately *not* propagated through the hardware
//! port: a failed read becomes NaN there (see [`crate::app::ports::MeasurePort`]).
//! [`SensorError`] only exists below that boundary, inside the drivers.

use core::fmt;

use crate::ringlog::schema::ColType;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The ring log rejected a row.
    Store(StoreError),
    /// A measurement driver failed below the hardware port.
    Sensor(SensorError),
    /// A control-surface request was rejected.
    Api(ApiError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Api(e) => write!(f, "api: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Ring log store rejections
// ---------------------------------------------------------------------------

/// Why [`RingLog::store`](crate::ringlog::RingLog::store) refused a row.
/// A rejected store never touches head, size or storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Schema is empty, too wide, or the budget holds zero rows.
    Unsized,
    /// Value count differs from the schema column count.
    ColumnCount { expected: usize, got: usize },
    /// A value's tag does not match its column's declared type.
    TypeMismatch {
        column: usize,
        expected: ColType,
        got: ColType,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsized => write!(f, "ring log has zero capacity"),
            Self::ColumnCount { expected, got } => {
                write!(f, "expected {expected} values, got {got}")
            }
            Self::TypeMismatch {
                column,
                expected,
                got,
            } => write!(f, "column {column}: expected {expected:?}, got {got:?}"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction with the power monitor failed.
    BusReadFailed,
    /// No measurement path is wired for this quantity.
    NotConfigured,
    /// Writing the calibration register failed.
    CalibrationFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusReadFailed => write!(f, "bus read failed"),
            Self::NotConfigured => write!(f, "no measurement path configured"),
            Self::CalibrationFailed => write!(f, "calibration write failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Control-surface errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Request carried no body.
    MissingBody,
    /// Body is not valid JSON for the endpoint.
    MalformedBody,
    /// `cmd` names no known command.
    UnknownCommand,
    /// Program parameters cannot change while a run is in progress.
    NotIdle,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBody => write!(f, "missing body"),
            Self::MalformedBody => write!(f, "malformed body"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::NotIdle => write!(f, "program is running"),
        }
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
