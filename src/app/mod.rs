//! Application core — pure domain logic, zero I/O.
//!
//! This module wires the battery cycler's business rules together: the
//! program state machine, the phase controller and the ring log cadence.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
