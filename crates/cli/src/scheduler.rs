// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Single-slot coalescing scheduler for reconciliation passes.
//!
//! At most one pass runs at a time. A request that arrives while a pass is
//! running reserves exactly one follow-up pass; any further requests fold
//! into that same reservation.

use std::sync::atomic::{AtomicU8, Ordering};

/// Scheduler state values for the atomic state field.
const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
/// Running, with a follow-up pass reserved.
const STATE_PENDING: u8 = 2;

/// Lock-free pass admission.
#[derive(Debug)]
pub struct CoalescingScheduler {
    state: AtomicU8,
}

impl CoalescingScheduler {
    pub fn new() -> Self {
        CoalescingScheduler {
            state: AtomicU8::new(STATE_IDLE),
        }
    }

    /// Asks to run a pass.
    ///
    /// Returns a guard if the caller should run the pass now, or `None` if a
    /// running pass will pick the request up as its follow-up.
    pub fn try_start(&self) -> Option<PassGuard<'_>> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match current {
                STATE_IDLE => STATE_RUNNING,
                STATE_RUNNING => STATE_PENDING,
                _ => return None,
            };
            match self
                .state
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) if next == STATE_RUNNING => {
                    return Some(PassGuard {
                        scheduler: self,
                        released: false,
                    })
                }
                Ok(_) => return None,
                Err(actual) => current = actual,
            }
        }
    }

    /// True while a pass is running.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) != STATE_IDLE
    }
}

impl Default for CoalescingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by whoever is running passes. Dropping it releases the scheduler.
#[derive(Debug)]
pub struct PassGuard<'a> {
    scheduler: &'a CoalescingScheduler,
    released: bool,
}

impl PassGuard<'_> {
    /// Called after each pass. Returns true if a follow-up pass was
    /// requested meanwhile and should run now; otherwise releases the
    /// scheduler.
    pub fn follow_up(&mut self) -> bool {
        let state = &self.scheduler.state;
        match state.compare_exchange(
            STATE_RUNNING,
            STATE_IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.released = true;
                false
            }
            Err(STATE_PENDING) => {
                // Only the guard holder leaves the pending state.
                state.store(STATE_RUNNING, Ordering::Release);
                true
            }
            Err(_) => {
                self.released = true;
                false
            }
        }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.scheduler.state.store(STATE_IDLE, Ordering::Release);
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
