//! A contention harness for compare-and-swap strategies on one shared
//! reference field.

/// One way of performing "if the cell holds `old`, replace it with `new`".
///
/// Implementations return `new` on success and `old` on failure, and bump
/// exactly one of the trial's counters. A compare mismatch is an outcome,
/// not an error: `Err` is reserved for access failures.
pub trait UpdateStrategy: Copy + Default + Send + Sync + 'static {
    const KIND: StrategyKind;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError>;
}

pub mod access;
pub mod audit;
mod buffer;
mod cell;
mod counters;
pub mod error;
mod monitor;
pub mod runner;
pub mod strategy;
mod trial;

pub use crate::audit::{AuditReport, RaceAudit};
pub use crate::buffer::{Buffer, CandidatePool, DEFAULT_BUFFER_LEN, DEFAULT_POOL_SIZE};
pub use crate::cell::{SharedCell, Slot};
pub use crate::counters::{OutcomeCounters, TrialReport};
pub use crate::error::{AccessError, SetupError, TrialError};
pub use crate::monitor::{Monitor, MonitorGuard};
pub use crate::runner::{BenchmarkResult, RunOptions, Runner};
pub use crate::strategy::{
    attempt, HandleCas, HandleReadWrite, Handles, LockedRaw, LockedReflective, RawUnsynchronized,
    Reflective, StrategyKind,
};
pub use crate::trial::{Budget, IterationStats, Trial};
