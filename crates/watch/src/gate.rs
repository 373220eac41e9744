//! Single-flight concurrency gate.
//!
//! One busy flag guards the whole pipeline: a trigger that arrives while a
//! run is in flight is dropped, not queued.  The gate is a plain injected
//! value with two mutators, so the single-in-flight invariant is testable
//! without spawning workers.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct BusyGate {
    busy: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt the idle → busy transition.  Returns `false` (drop the
    /// trigger) when a run is already in flight.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Busy → idle.  Called on worker completion (success, error, or crash)
    /// and at the start of a manual refresh; these are the only idle edges,
    /// so a crashed worker can never wedge the system.
    pub fn release(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let gate = BusyGate::new();
        assert!(!gate.is_busy());
    }

    #[test]
    fn second_acquire_fails_until_release() {
        let gate = BusyGate::new();
        assert!(gate.try_acquire());
        assert!(gate.is_busy());
        assert!(!gate.try_acquire(), "gate held: trigger must be dropped");

        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn release_is_idempotent() {
        let gate = BusyGate::new();
        gate.release();
        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn acquire_is_race_free_across_threads() {
        let gate = std::sync::Arc::new(BusyGate::new());
        let winners: usize = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || usize::from(gate.try_acquire()))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();
        assert_eq!(winners, 1, "exactly one contender may acquire the gate");
    }
}
