//! Output drivers and the loop watchdog.

pub mod relay;
pub mod watchdog;
