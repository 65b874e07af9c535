//! The six ways of swapping the cell's buffer.
//!
//! Every strategy runs the same logical step: if the cell still holds
//! `old`, store `new` and count a success, otherwise count a failure. They
//! differ only in how the compare and the write are reached and what ties
//! them together.

use crate::access::{AtomicHandle, FieldAccessor};
use crate::buffer::Buffer;
use crate::cell::SharedCell;
use crate::counters::OutcomeCounters;
use crate::error::{AccessError, SetupError};
use crate::monitor::Monitor;
use crate::UpdateStrategy;
use std::fmt;

/// Name of the field every strategy updates.
pub const FIELD: &str = "current";

/// Benchmark group the strategies are registered under.
pub const GROUP: &str = "cas_strategies";

/// Trial-scoped state shared by all workers besides the cell itself.
#[derive(Debug)]
pub struct Handles {
    accessor: FieldAccessor,
    handle: AtomicHandle,
    monitor: Monitor,
    counters: OutcomeCounters,
}

impl Handles {
    /// Binds both access paths to [`FIELD`].
    pub fn bind() -> Result<Self, SetupError> {
        Self::bind_field(FIELD)
    }

    pub fn bind_field(name: &str) -> Result<Self, SetupError> {
        Ok(Self {
            accessor: FieldAccessor::bind(name)?,
            handle: AtomicHandle::bind(name)?,
            monitor: Monitor::new(),
            counters: OutcomeCounters::new(),
        })
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn counters(&self) -> &OutcomeCounters {
        &self.counters
    }

    /// Bundle whose reflective path points at `accessor` instead of [`FIELD`].
    #[cfg(test)]
    pub(crate) fn with_accessor(accessor: FieldAccessor) -> Self {
        Self {
            accessor,
            handle: AtomicHandle::bind(FIELD).unwrap(),
            monitor: Monitor::new(),
            counters: OutcomeCounters::new(),
        }
    }

    fn settle<'p>(&self, swapped: bool, old: &'p Buffer, new: &'p Buffer) -> &'p Buffer {
        if swapped {
            self.counters.record_success();
            new
        } else {
            self.counters.record_failure();
            old
        }
    }
}

/// The measured operation: snapshot the cell, pick the next candidate from
/// the success count, and let `strategy` try the swap.
pub fn attempt<'p, S: UpdateStrategy>(
    strategy: &S,
    handles: &Handles,
    cell: &SharedCell<'p>,
) -> Result<&'p Buffer, AccessError> {
    let old = cell.read();
    let new = cell.pool().candidate(handles.counters.successes());
    strategy.execute(handles, cell, old, new)
}

/// Direct field read, then direct field write. Nothing stops another worker
/// from writing in between.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawUnsynchronized;

impl UpdateStrategy for RawUnsynchronized {
    const KIND: StrategyKind = StrategyKind::Raw;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError> {
        let swapped = cell.read().same(old);
        if swapped {
            cell.write(new);
        }
        Ok(handles.settle(swapped, old, new))
    }
}

/// [`RawUnsynchronized`] with the whole attempt held under the monitor.
#[derive(Debug, Default, Clone, Copy)]
pub struct LockedRaw;

impl UpdateStrategy for LockedRaw {
    const KIND: StrategyKind = StrategyKind::LockedRaw;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError> {
        handles
            .monitor
            .synchronized(|| RawUnsynchronized.execute(handles, cell, old, new))
    }
}

/// Read and write through the reflective accessor, no lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reflective;

impl UpdateStrategy for Reflective {
    const KIND: StrategyKind = StrategyKind::Reflective;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError> {
        let swapped = handles.accessor.get(cell)?.same(old);
        if swapped {
            handles.accessor.set(cell, new)?;
        }
        Ok(handles.settle(swapped, old, new))
    }
}

/// [`Reflective`] under the monitor.
#[derive(Debug, Default, Clone, Copy)]
pub struct LockedReflective;

impl UpdateStrategy for LockedReflective {
    const KIND: StrategyKind = StrategyKind::LockedReflective;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError> {
        handles
            .monitor
            .synchronized(|| Reflective.execute(handles, cell, old, new))
    }
}

/// Atomic handle `get`, then atomic handle `set`. Each half is atomic, the
/// pair is not: same race window as [`RawUnsynchronized`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleReadWrite;

impl UpdateStrategy for HandleReadWrite {
    const KIND: StrategyKind = StrategyKind::HandleReadWrite;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError> {
        let swapped = handles.handle.get(cell).same(old);
        if swapped {
            handles.handle.set(cell, new);
        }
        Ok(handles.settle(swapped, old, new))
    }
}

/// One `compare_and_set` on the atomic handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleCas;

impl UpdateStrategy for HandleCas {
    const KIND: StrategyKind = StrategyKind::HandleCas;

    fn execute<'p>(
        &self,
        handles: &Handles,
        cell: &SharedCell<'p>,
        old: &'p Buffer,
        new: &'p Buffer,
    ) -> Result<&'p Buffer, AccessError> {
        let swapped = handles.handle.compare_and_set(cell, old, new);
        Ok(handles.settle(swapped, old, new))
    }
}

/// Runtime name for each strategy, used for filtering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Raw,
    LockedRaw,
    Reflective,
    LockedReflective,
    HandleReadWrite,
    HandleCas,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Raw,
        StrategyKind::LockedRaw,
        StrategyKind::Reflective,
        StrategyKind::LockedReflective,
        StrategyKind::HandleReadWrite,
        StrategyKind::HandleCas,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Raw => "raw",
            StrategyKind::LockedRaw => "locked_raw",
            StrategyKind::Reflective => "reflective",
            StrategyKind::LockedReflective => "locked_reflective",
            StrategyKind::HandleReadWrite => "handle_read_write",
            StrategyKind::HandleCas => "handle_cas",
        }
    }

    /// Whether compare and swap happen as one linearizable step.
    pub fn is_linearizable(self) -> bool {
        !matches!(
            self,
            StrategyKind::Raw | StrategyKind::Reflective | StrategyKind::HandleReadWrite
        )
    }

    pub fn qualified_name(self) -> String {
        format!("{GROUP}.{}", self.name())
    }

    /// Substring match against the qualified name; an empty filter selects
    /// everything.
    pub fn matches(self, filter: &str) -> bool {
        self.qualified_name().contains(filter)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
