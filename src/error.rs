//! Error types for trial setup and per-attempt field access.
//!
//! A compare mismatch is never an error: it is a counted outcome. Everything
//! here either aborts a trial before any worker runs ([`SetupError`]) or
//! invalidates the attempt that raised it ([`AccessError`]).

use std::io;
use thiserror::Error;

/// Binding or configuration failure detected before any worker starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The descriptor table has no field with this name.
    #[error("no field named '{name}' on {owner}")]
    NoSuchField { owner: &'static str, name: String },

    /// The field exists but does not hold the requested type.
    #[error("field '{field}' holds {actual}, expected {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    /// The field cannot be projected to an atomic slot.
    #[error("field '{field}' does not support atomic access")]
    NotAtomic { field: &'static str },

    /// A candidate pool must hold at least one buffer.
    #[error("candidate pool must hold at least one buffer")]
    EmptyPool,

    /// A trial needs at least one worker thread.
    #[error("trial needs at least one worker thread")]
    NoWorkers,
}

/// Failure of a single reflective access.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("field '{field}' is read-only")]
    ReadOnly { field: &'static str },

    #[error("field '{field}' is not accessible on {owner}")]
    Inaccessible {
        owner: &'static str,
        field: &'static str,
    },

    #[error("accessor for {expected}.{field} applied to {actual}")]
    WrongReceiver {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Anything that stops a trial from producing a report.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("trial setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("update attempt failed: {0}")]
    Access(#[from] AccessError),

    #[error("worker thread panicked")]
    WorkerPanicked,

    #[error("failed to write trial report: {0}")]
    Io(#[from] io::Error),
}

pub type TrialResult<T> = Result<T, TrialError>;
