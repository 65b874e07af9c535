use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Success and failure tallies shared by every worker of one trial.
///
/// Increments are atomic read-modify-writes, so no update is ever lost;
/// they carry no ordering because the final values are only read after every
/// worker has been joined.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    successes: AtomicU64,
    failures: AtomicU64,
}

impl OutcomeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> TrialReport {
        TrialReport {
            successes: self.successes(),
            failures: self.failures(),
        }
    }
}

/// Final tallies of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialReport {
    pub successes: u64,
    pub failures: u64,
}

impl TrialReport {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<<<Passed: {}. Failed: {}. Total: {}>>>",
            self.successes,
            self.failures,
            self.total()
        )
    }
}
