//! Fuzz target: `RingLog::store` / `export`
//!
//! Decodes the input into a byte budget and a sequence of rows with
//! arbitrary cell tags, then verifies:
//! - No panics on any budget, including ones that hold zero rows
//! - `len()` never exceeds `capacity()`
//! - A rejected row leaves the row count untouched
//! - `export_len()` equals the length of the exported text
//!
//! cargo fuzz run fuzz_ring_log

#![no_main]

use battcycler::ringlog::RingLog;
use battcycler::ringlog::schema::{MEASUREMENT_SCHEMA, Value};
use libfuzzer_sys::fuzz_target;

fn cell(tag: u8, raw: [u8; 4]) -> Value {
    match tag % 4 {
        0 => Value::U8(raw[0]),
        1 => Value::U16(u16::from_le_bytes([raw[0], raw[1]])),
        2 => Value::U32(u32::from_le_bytes(raw)),
        _ => Value::F32(f32::from_le_bytes(raw)),
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&budget, mut rest)) = data.split_first() else {
        return;
    };
    let mut log = RingLog::new(&MEASUREMENT_SCHEMA, usize::from(budget) * 3);

    // Each row: one width byte (0..=8 cells), then 5 bytes per cell.
    while let Some((&width, tail)) = rest.split_first() {
        let width = usize::from(width % 9);
        if tail.len() < width * 5 {
            break;
        }
        let (cells, tail) = tail.split_at(width * 5);
        rest = tail;

        let row: Vec<Value> = cells
            .chunks_exact(5)
            .map(|c| cell(c[0], [c[1], c[2], c[3], c[4]]))
            .collect();

        let before = log.len();
        if log.store(&row).is_err() {
            assert_eq!(log.len(), before, "rejected store changed the log");
        }
        assert!(log.len() <= log.capacity());
    }

    let mut out = String::new();
    log.export(&mut out).expect("String never fails");
    assert_eq!(log.export_len(), out.len());
    assert_eq!(log.rows().count(), log.len());
});
