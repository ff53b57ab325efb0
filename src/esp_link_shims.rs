//! `critical-section` 1.x provider for ESP-IDF builds.
//!
//! [`SharedRingLog`](crate::ringlog::SharedRingLog) locks through
//! `critical_section::with`.  The HTTP download holds that lock while it
//! writes to the socket, so the section is a FreeRTOS-backed task mutex
//! rather than an interrupt mask: the sampling task blocks, interrupts and
//! other tasks keep running.  Re-entry from the owning task only bumps a
//! depth counter.
//!
//! The exported symbols exist on the device only; host builds link the
//! `critical-section` std implementation instead.

#![cfg_attr(not(target_os = "espidf"), allow(dead_code))]

use core::cell::{Cell, RefCell};
use std::sync::{Mutex, MutexGuard, PoisonError};

static SECTION: Mutex<()> = Mutex::new(());

thread_local! {
    static DEPTH: Cell<u8> = const { Cell::new(0) };
    static GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

fn acquire() -> u8 {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            let lock = SECTION.lock().unwrap_or_else(PoisonError::into_inner);
            GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let next = d.saturating_add(1);
        depth.set(next);
        next
    })
}

fn release() {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    });
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    acquire()
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    release();
}
