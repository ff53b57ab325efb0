//! Column schema and tagged row values.
//!
//! The schema is an ordered list of typed columns fixed at build time.  It
//! defines both the packed row layout and the export header.

use core::fmt;

/// Storage type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColType {
    U8,
    U16,
    U32,
    F32,
}

impl ColType {
    /// Packed width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// One named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColType) -> Self {
        Self { name, ty }
    }
}

/// A single cell value.  The tag is checked against the column type at
/// store time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
}

impl Value {
    pub const fn col_type(&self) -> ColType {
        match self {
            Self::U8(_) => ColType::U8,
            Self::U16(_) => ColType::U16,
            Self::U32(_) => ColType::U32,
            Self::F32(_) => ColType::F32,
        }
    }
}

/// Floats are exported with this many decimals.
pub const FLOAT_DECIMALS: usize = 4;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{:.*}", FLOAT_DECIMALS, v),
        }
    }
}

/// Widest schema a ring log accepts.  Decoded rows are returned in a
/// fixed-capacity vector of this size.
pub const MAX_COLUMNS: usize = 16;

/// Sum of column widths, i.e. the packed row size.
pub fn row_width(schema: &[Column]) -> usize {
    schema.iter().map(|c| c.ty.width()).sum()
}

// ───────────────────────────────────────────────────────────────
// Measurement row schema
// ───────────────────────────────────────────────────────────────

pub const COL_TIME: usize = 0;
pub const COL_CYCLE: usize = 1;
pub const COL_PHASE: usize = 2;
pub const COL_STATUS: usize = 3;
pub const COL_VOLTAGE: usize = 4;
pub const COL_CURRENT: usize = 5;
pub const COL_ENERGY: usize = 6;

/// Row layout of the cycle history: uptime, cycle, phase code, run-state
/// code, bus voltage, bus current and per-phase energy.
pub const MEASUREMENT_SCHEMA: [Column; 7] = [
    Column::new("Time_s", ColType::U32),
    Column::new("Cycle", ColType::U16),
    Column::new("Phase", ColType::U8),
    Column::new("Status", ColType::U8),
    Column::new("U_V", ColType::F32),
    Column::new("I_A", ColType::F32),
    Column::new("Ephase_Wh", ColType::F32),
];
