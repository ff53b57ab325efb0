//! INA219 bidirectional current / bus-voltage monitor (I²C).
//!
//! Register access is big-endian.  The calibration register is written
//! again before every current read: a brown-out on the sensor resets it
//! to zero and the current register would read 0 mA forever.
//!
//! ```text
//!   0x00 CONFIG   0x02 BUS_VOLTAGE   0x04 CURRENT   0x05 CALIBRATION
//! ```

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SensorError;

const REG_CONFIG: u8 = 0x00;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

/// Bus voltage LSB (mV) after dropping the 3 status bits.
const BUS_LSB_MV: u16 = 4;

/// Range / resolution presets.  Calibration values assume a 0.1 Ω shunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationPreset {
    /// 32 V bus, ±3.2 A, 0.1 mA/bit.
    #[default]
    Range32V2A,
    /// 32 V bus, ±1.3 A, 0.04 mA/bit.
    Range32V1A,
    /// 16 V bus, ±400 mA, 0.05 mA/bit.
    Range16V400mA,
}

impl CalibrationPreset {
    pub const fn calibration(self) -> u16 {
        match self {
            Self::Range32V2A => 4096,
            Self::Range32V1A => 10240,
            Self::Range16V400mA => 8192,
        }
    }

    /// Raw current counts per mA.
    pub const fn current_divider_ma(self) -> f32 {
        match self {
            Self::Range32V2A => 10.0,
            Self::Range32V1A => 25.0,
            Self::Range16V400mA => 20.0,
        }
    }

    /// Bus range, PGA gain, 12-bit ADCs, continuous shunt + bus.
    pub const fn config(self) -> u16 {
        match self {
            Self::Range32V2A | Self::Range32V1A => 0x399F,
            Self::Range16V400mA => 0x019F,
        }
    }
}

pub struct Ina219<I2C> {
    i2c: I2C,
    address: u8,
    preset: CalibrationPreset,
}

impl<I2C: I2c> Ina219<I2C> {
    pub fn new(i2c: I2C, address: u8, preset: CalibrationPreset) -> Self {
        Self {
            i2c,
            address,
            preset,
        }
    }

    /// Program calibration and configuration.  Fails if the chip does
    /// not acknowledge.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.write_reg(REG_CALIBRATION, self.preset.calibration())
            .and_then(|()| self.write_reg(REG_CONFIG, self.preset.config()))
            .map_err(|_| SensorError::CalibrationFailed)
    }

    pub fn bus_voltage_v(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_reg(REG_BUS_VOLTAGE)?;
        let mv = (raw >> 3) * BUS_LSB_MV;
        Ok(f32::from(mv) * 0.001)
    }

    pub fn current_a(&mut self) -> Result<f32, SensorError> {
        self.write_reg(REG_CALIBRATION, self.preset.calibration())?;
        let raw = self.read_reg(REG_CURRENT)? as i16;
        let ma = f32::from(raw) / self.preset.current_divider_ma();
        Ok(ma / 1000.0)
    }

    pub fn preset(&self) -> CalibrationPreset {
        self.preset
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), SensorError> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c.write(self.address, &[reg, hi, lo]).map_err(|e| {
            warn!("INA219 write 0x{:02X} failed: {:?}", reg, e);
            SensorError::BusReadFailed
        })
    }

    fn read_reg(&mut self, reg: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| {
                warn!("INA219 read 0x{:02X} failed: {:?}", reg, e);
                SensorError::BusReadFailed
            })?;
        Ok(u16::from_be_bytes(buf))
    }
}

// ───────────────────────────────────────────────────────────────
// Absent bus
// ───────────────────────────────────────────────────────────────

/// Stand-in bus for builds without an I²C peripheral.  Every transaction
/// NACKs, so an [`Ina219`] on it never initialises.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBus;

impl ErrorType for NoBus {
    type Error = ErrorKind;
}

impl I2c for NoBus {
    fn transaction(
        &mut self,
        _address: u8,
        _operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        Err(ErrorKind::NoAcknowledge(
            embedded_hal::i2c::NoAcknowledgeSource::Address,
        ))
    }
}
