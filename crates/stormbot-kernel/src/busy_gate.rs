//! [`BusyGate`] – non-blocking mutual exclusion over the actuators.
//!
//! Producers that fail to acquire must back off and keep polling their other
//! conditions (obstacles, shutdown); they never queue. That is why this is an
//! atomic flag and not a lock: a blocking mutex would park a producer exactly
//! when it needs to stay live.
//!
//! # Example
//!
//! ```
//! use stormbot_kernel::BusyGate;
//!
//! let gate = BusyGate::new();
//! assert!(gate.try_acquire());
//! assert!(!gate.try_acquire());
//! gate.release();
//! assert!(gate.try_acquire());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

/// Advisory busy flag serializing actuator access across producers.
///
/// At most one holder at any time. Every actuator-driving path must hold the
/// gate for its entire execution and release it on every exit path —
/// [`BusyGate::acquire_guard`] ties the release to a `Drop` so a panicking or
/// early-returning holder can never permanently lock out the other producers.
#[derive(Default)]
pub struct BusyGate {
    busy: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the actuators. Returns `true` only if the gate was
    /// free; the caller then owns the actuators until [`release`][Self::release].
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Free the gate. Idempotent: safe to call from cleanup paths even when
    /// the gate is not held.
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// `true` while some producer owns the actuators.
    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// [`try_acquire`][Self::try_acquire] with the release tied to a guard's
    /// `Drop`. Returns `None` if the gate is already held.
    pub fn acquire_guard(&self) -> Option<BusyGuard<'_>> {
        if self.try_acquire() {
            Some(BusyGuard { gate: self })
        } else {
            None
        }
    }
}

/// Holds the gate; releases it on drop.
pub struct BusyGuard<'a> {
    gate: &'a BusyGate,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
