//! Single-flight guard for mutating commands
//!
//! At most one command may be outstanding. Acquisition hands out a
//! `CommandPermit`; the flag is cleared when the permit is released or
//! dropped, so every exit path of the guarded operation releases exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CommandGate {
    in_flight: Arc<AtomicBool>,
}

impl CommandGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate if no command is in flight. Never waits.
    pub fn try_acquire(&self) -> Option<CommandPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CommandPermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Proof of a successful acquisition
#[derive(Debug)]
#[must_use = "dropping the permit releases the gate immediately"]
pub struct CommandPermit {
    in_flight: Arc<AtomicBool>,
}

impl CommandPermit {
    /// Release the gate. Same as dropping the permit.
    pub fn release(self) {}
}

impl Drop for CommandPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
