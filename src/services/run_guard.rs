//! Single-flight admission for reconciliation runs.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// `Idle` / `Running` flag owned by one job instance.
///
/// Scoped to the process: two replicas of the service each have their own
/// guard and can run concurrently.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Proof of admission. Dropping it puts the guard back to `Idle`, whether the
/// run returned, failed or panicked.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Idle -> Running`, or `None` if a run is already in flight.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().expect("idle guard admits");
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn released_on_panic() {
        let guard = RunGuard::new();
        let cloned = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _permit = cloned.try_acquire().unwrap();
            panic!("run blew up");
        });
        assert!(result.is_err());
        assert!(!guard.is_running());
    }

    #[test]
    fn instances_are_independent() {
        let a = RunGuard::new();
        let b = RunGuard::new();
        let _held = a.try_acquire().unwrap();
        assert!(b.try_acquire().is_some());
    }
}
