//! Schema-driven binary ring log.
//!
//! Stores one packed row per sample tick in a byte budget fixed at
//! startup.  Once full, every store overwrites the oldest row.
//!
//! ```text
//!   storage: [ row0 | row1 | row2 | ... | row(cap-1) ]
//!                       ▲ oldest        ▲ head (next write)
//! ```
//!
//! No downsampling, no aggregation.  Export decodes every valid row back
//! to text, oldest first, under a header of column names.

pub mod codec;
pub mod schema;

extern crate alloc;
use alloc::boxed::Box;
use alloc::vec;
use core::cell::RefCell;
use core::fmt::{self, Write};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use crate::error::StoreError;
use schema::{Column, MAX_COLUMNS, Value, row_width};

/// Decoded row, one value per column.
pub type Row = heapless::Vec<Value, MAX_COLUMNS>;

/// Field separator in exported text.
const DELIMITER: char = ',';

/// Fixed-capacity circular buffer of packed rows.
pub struct RingLog {
    schema: &'static [Column],
    storage: Box<[u8]>,
    row_bytes: usize,
    capacity: usize,
    /// Next write slot.
    head: usize,
    /// Number of valid rows (0..=capacity).
    size: usize,
}

impl RingLog {
    /// Bind `schema` to a buffer of `budget_bytes`.  Row size and capacity
    /// are derived here once.  An empty or over-wide schema yields a log of
    /// zero capacity that rejects every store.
    pub fn new(schema: &'static [Column], budget_bytes: usize) -> Self {
        let row_bytes = if schema.is_empty() || schema.len() > MAX_COLUMNS {
            0
        } else {
            row_width(schema)
        };
        let capacity = budget_bytes.checked_div(row_bytes).unwrap_or(0);
        if capacity == 0 {
            warn!(
                "ring log unsized: {} columns, {} B budget",
                schema.len(),
                budget_bytes
            );
        } else {
            info!(
                "ring log: {} B/row, {} rows in {} B",
                row_bytes, capacity, budget_bytes
            );
        }

        Self {
            schema,
            storage: vec![0u8; capacity * row_bytes].into_boxed_slice(),
            row_bytes,
            capacity,
            head: 0,
            size: 0,
        }
    }

    /// Forget every row.  Storage is not zeroed; stale bytes are
    /// unreachable until overwritten.
    pub fn clear(&mut self) {
        self.head = 0;
        self.size = 0;
    }

    /// Append one row.  `values` must match the schema in count and type;
    /// a rejected row leaves the log untouched.
    pub fn store(&mut self, values: &[Value]) -> Result<(), StoreError> {
        if self.capacity == 0 {
            return Err(StoreError::Unsized);
        }
        if values.len() != self.schema.len() {
            return Err(StoreError::ColumnCount {
                expected: self.schema.len(),
                got: values.len(),
            });
        }
        if let Some((column, (col, value))) = self
            .schema
            .iter()
            .zip(values)
            .enumerate()
            .find(|(_, (col, value))| col.ty != value.col_type())
        {
            return Err(StoreError::TypeMismatch {
                column,
                expected: col.ty,
                got: value.col_type(),
            });
        }

        let start = self.head * self.row_bytes;
        let row = &mut self.storage[start..start + self.row_bytes];
        let mut off = 0;
        for value in values {
            off += codec::encode_cell(&mut row[off..], *value);
        }

        self.head = (self.head + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
        debug!("ring log: stored row, size={}/{}", self.size, self.capacity);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    pub fn schema(&self) -> &'static [Column] {
        self.schema
    }

    /// Decoded rows, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        let oldest = self.oldest_slot();
        (0..self.size).map(move |k| self.decode_slot((oldest + k) % self.capacity))
    }

    /// Write the header line and every valid row, oldest first.
    pub fn export<W: Write>(&self, out: &mut W) -> fmt::Result {
        for (i, col) in self.schema.iter().enumerate() {
            if i > 0 {
                out.write_char(DELIMITER)?;
            }
            out.write_str(col.name)?;
        }
        out.write_char('\n')?;

        for row in self.rows() {
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    out.write_char(DELIMITER)?;
                }
                write!(out, "{value}")?;
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    /// Exact byte length of [`export`](Self::export) output, from a
    /// counting pass over the same routine.
    pub fn export_len(&self) -> usize {
        let mut counter = CountingWriter::default();
        // Counting never fails.
        let _ = self.export(&mut counter);
        counter.count()
    }

    // ── Internal ──────────────────────────────────────────────

    fn oldest_slot(&self) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        (self.head + self.capacity - self.size) % self.capacity
    }

    fn decode_slot(&self, slot: usize) -> Row {
        let start = slot * self.row_bytes;
        let bytes = &self.storage[start..start + self.row_bytes];
        let mut row = Row::new();
        let mut off = 0;
        for col in self.schema {
            // Schema width is bounded by MAX_COLUMNS at construction.
            let _ = row.push(codec::decode_cell(&bytes[off..], col.ty));
            off += col.ty.width();
        }
        row
    }
}

// ───────────────────────────────────────────────────────────────
// Counting sink
// ───────────────────────────────────────────────────────────────

/// `fmt::Write` sink that only counts bytes.  Used to compute a
/// `Content-Length` before streaming.
#[derive(Debug, Default)]
pub struct CountingWriter {
    count: usize,
}

impl CountingWriter {
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Write for CountingWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.count += s.len();
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Shared handle
// ───────────────────────────────────────────────────────────────

/// Ring log behind a blocking mutex, so the sampling path and a download
/// served from another task never interleave a store with an export.
pub struct SharedRingLog {
    inner: Mutex<CriticalSectionRawMutex, RefCell<RingLog>>,
}

impl SharedRingLog {
    pub fn new(log: RingLog) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(log)),
        }
    }

    /// Run `f` with exclusive access to the log.
    pub fn with<R>(&self, f: impl FnOnce(&mut RingLog) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn store(&self, values: &[Value]) -> Result<(), StoreError> {
        self.with(|log| log.store(values))
    }

    pub fn clear(&self) {
        self.with(RingLog::clear);
    }

    pub fn len(&self) -> usize {
        self.with(|log| log.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
