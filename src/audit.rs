//! Lost-update detection.
//!
//! The benchmark's own workload cycles through three buffers, so a lost
//! update is invisible in its counters. The audit instead gives every attempt
//! its own never-before-written buffer. Under a linearizable strategy each
//! buffer can then be replaced at most once; two successes that both claim to
//! have replaced the same buffer are a lost update.

use crate::buffer::CandidatePool;
use crate::cell::SharedCell;
use crate::error::{SetupError, TrialError, TrialResult};
use crate::strategy::{Handles, StrategyKind};
use crate::UpdateStrategy;
use std::sync::Barrier;
use std::thread;
use tracing::debug;

/// Outcome of one audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReport {
    pub kind: StrategyKind,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Successes beyond the first for the same replaced buffer.
    pub duplicate_claims: u64,
    pub final_in_pool: bool,
}

impl AuditReport {
    pub fn is_race_free(&self) -> bool {
        self.duplicate_claims == 0
    }

    pub fn counts_conserved(&self) -> bool {
        self.successes + self.failures == self.attempts
    }
}

/// A reusable chain of unique buffers, one per attempt plus the initial one.
#[derive(Debug)]
pub struct RaceAudit {
    pool: CandidatePool,
    threads: usize,
    attempts_per_worker: usize,
}

impl RaceAudit {
    pub fn new(threads: usize, attempts_per_worker: usize) -> Result<Self, SetupError> {
        if threads == 0 {
            return Err(SetupError::NoWorkers);
        }
        let pool = CandidatePool::prepare(threads * attempts_per_worker + 1, 1)?;
        Ok(Self {
            pool,
            threads,
            attempts_per_worker,
        })
    }

    /// Runs one round on a fresh cell with fresh counters.
    pub fn run<S: UpdateStrategy>(&self, strategy: S) -> TrialResult<AuditReport> {
        let cell = SharedCell::new(&self.pool);
        let handles = Handles::bind()?;
        let start = Barrier::new(self.threads);
        let (cell, handles, start) = (&cell, &handles, &start);

        let per_worker = self.attempts_per_worker;
        let chain = self.pool.as_slice();

        let results: Vec<_> = thread::scope(|s| {
            let workers: Vec<_> = (0..self.threads)
                .map(|w| {
                    let own = &chain[w * per_worker..(w + 1) * per_worker];
                    s.spawn(move || {
                        start.wait();

                        let mut claimed = Vec::new();
                        for new in own {
                            let old = cell.read();
                            if strategy.execute(handles, cell, old, new)?.same(new) {
                                claimed.extend(cell.pool().index_of(old));
                            }
                        }
                        Ok::<_, TrialError>(claimed)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join()).collect()
        });

        let mut claimed = Vec::new();
        for result in results {
            claimed.extend(result.map_err(|_| TrialError::WorkerPanicked)??);
        }
        claimed.sort_unstable();
        let duplicate_claims = claimed.windows(2).filter(|pair| pair[0] == pair[1]).count() as u64;

        let counters = handles.counters();
        let report = AuditReport {
            kind: S::KIND,
            attempts: (self.threads * per_worker) as u64,
            successes: counters.successes(),
            failures: counters.failures(),
            duplicate_claims,
            final_in_pool: self.pool.contains(cell.read()),
        };
        debug!(strategy = S::KIND.name(), ?report, "audit round finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{HandleCas, LockedReflective, RawUnsynchronized};

    #[test]
    fn test_single_worker_claims_whole_chain() {
        let audit = RaceAudit::new(1, 50).unwrap();
        let report = audit.run(RawUnsynchronized).unwrap();
        assert_eq!(report.successes, 50);
        assert_eq!(report.failures, 0);
        assert!(report.is_race_free());
        assert!(report.final_in_pool);
    }

    #[test]
    fn test_linearizable_strategies_never_double_claim() {
        let audit = RaceAudit::new(8, 2_000).unwrap();
        for report in [
            audit.run(HandleCas).unwrap(),
            audit.run(LockedReflective).unwrap(),
        ] {
            assert!(report.counts_conserved(), "{report:?}");
            assert!(report.is_race_free(), "{report:?}");
            assert!(report.final_in_pool);
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert_eq!(RaceAudit::new(0, 1).unwrap_err(), SetupError::NoWorkers);
    }
}
