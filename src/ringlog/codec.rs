//! Packed little-endian cell codec.
//!
//! Layout of a row is the concatenation of each column's fixed-width
//! encoding in schema order:
//!
//! ```text
//! ┌──────────┬──────────┬─────┬──────┬──────────┬──────────┬──────────┐
//! │ Time u32 │ Cycle u16│Ph u8│St u8 │ U f32    │ I f32    │ E f32    │
//! │ LE 4B    │ LE 2B    │ 1B  │ 1B   │ LE 4B    │ LE 4B    │ LE 4B    │
//! └──────────┴──────────┴─────┴──────┴──────────┴──────────┴──────────┘
//! ```
//!
//! Floats are stored as their IEEE-754 bit pattern, so decode is exact.
//! Callers guarantee `dst`/`src` hold at least the cell width.

use super::schema::{ColType, Value};

/// Encode `value` into the head of `dst`.  Returns the bytes written.
pub fn encode_cell(dst: &mut [u8], value: Value) -> usize {
    match value {
        Value::U8(v) => {
            dst[0] = v;
            1
        }
        Value::U16(v) => {
            dst[..2].copy_from_slice(&v.to_le_bytes());
            2
        }
        Value::U32(v) => {
            dst[..4].copy_from_slice(&v.to_le_bytes());
            4
        }
        Value::F32(v) => {
            dst[..4].copy_from_slice(&v.to_bits().to_le_bytes());
            4
        }
    }
}

/// Decode one cell of type `ty` from the head of `src`.
pub fn decode_cell(src: &[u8], ty: ColType) -> Value {
    match ty {
        ColType::U8 => Value::U8(src[0]),
        ColType::U16 => Value::U16(u16::from_le_bytes([src[0], src[1]])),
        ColType::U32 => Value::U32(read_u32(src)),
        ColType::F32 => Value::F32(f32::from_bits(read_u32(src))),
    }
}

fn read_u32(src: &[u8]) -> u32 {
    u32::from_le_bytes([src[0], src[1], src[2], src[3]])
}
