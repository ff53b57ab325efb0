//! Wrap-safe millisecond arithmetic.
//!
//! Timestamps are `u32` milliseconds from a free-running counter that wraps
//! every ~49.7 days.  Elapsed time is the modular difference `now - since`,
//! which is correct across one wrap as long as the true interval is shorter
//! than the counter period.
//!
//! A stored mark that is *ahead* of `now` (a clock that stepped backwards)
//! reads as a huge interval.  That single rollover-instant error is an
//! accepted limitation; callers that need a guard check for a zero delta.

/// Milliseconds from `since` to `now`, modulo 2^32.
#[inline]
pub const fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

/// `true` once at least `duration_s` seconds have passed since `since_ms`.
#[inline]
pub fn has_elapsed(now_ms: u32, since_ms: u32, duration_s: u32) -> bool {
    u64::from(elapsed_ms(now_ms, since_ms)) >= u64::from(duration_s) * 1000
}

/// Hours represented by a millisecond interval.
#[inline]
pub fn ms_to_hours(ms: u32) -> f32 {
    ms as f32 / 3_600_000.0
}
