//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (relays, sensors, event sinks) implement these traits.
//! The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → relays)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the charge and discharge outputs.
///
/// Implementations must never leave both outputs energised: starting one
/// side turns the other side off first.
pub trait OutputPort {
    /// Both outputs off.  Safe from any state.
    fn all_off(&mut self);

    fn start_charge(&mut self);
    fn stop_charge(&mut self);

    fn start_discharge(&mut self);
    fn stop_discharge(&mut self);

    fn is_charge_on(&self) -> bool;
    fn is_discharge_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Measure port (driven adapter: sensors → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for battery measurements.
///
/// A failed read returns `NaN`; the domain logs it and carries on.
pub trait MeasurePort {
    /// Battery voltage in volts.
    fn read_voltage_v(&mut self) -> f32;

    /// Battery current in amperes.  Sign convention is the sensor's.
    fn read_current_a(&mut self) -> f32;
}

/// Both halves of the hardware boundary.
pub trait HardwarePort: OutputPort + MeasurePort {}

impl<T: OutputPort + MeasurePort> HardwarePort for T {}

// ───────────────────────────────────────────────────────────────
// Phase observer (phase controller → program state machine)
// ───────────────────────────────────────────────────────────────

/// Told when an active phase meets its end criterion.  The phase
/// controller calls this before entering the following wait.
pub trait PhaseObserver {
    fn phase_done(&mut self, hw: &mut impl OutputPort);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// status page, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// In-crate test double
// ───────────────────────────────────────────────────────────────
