//! GPIO / peripheral pin assignments for the cycler main board.
//!
//! Single source of truth for the defaults in
//! [`HardwareConfig`](crate::config::HardwareConfig).  A board variant
//! overrides them through the config rather than by editing drivers.

// ---------------------------------------------------------------------------
// Relay outputs (charge / discharge path)
// ---------------------------------------------------------------------------

/// Digital output: charger relay.  Active LOW on the reference board.
pub const CHARGE_RELAY_GPIO: i32 = 5;
/// Digital output: load relay.  Active LOW on the reference board.
pub const DISCHARGE_RELAY_GPIO: i32 = 6;

pub const CHARGE_ACTIVE_HIGH: bool = false;
pub const DISCHARGE_ACTIVE_HIGH: bool = false;

// ---------------------------------------------------------------------------
// I²C bus (INA219 current/voltage monitor)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
/// 7-bit address with A0/A1 strapped to GND.
pub const INA219_I2C_ADDR: u8 = 0x40;
pub const I2C_BAUD_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// ADC fallback (unpopulated on the reference board)
// ---------------------------------------------------------------------------

/// Full-scale raw reading of the 12-bit ADC.
pub const ADC_FULL_SCALE: u16 = 4095;
