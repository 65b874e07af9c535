use crate::buffer::{Buffer, CandidatePool};
use crate::cell::SharedCell;
use crate::counters::TrialReport;
use crate::error::{AccessError, SetupError, TrialError, TrialResult};
use crate::strategy::{self, Handles};
use crate::UpdateStrategy;
use std::hint::black_box;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long the workers of one iteration keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Every worker issues exactly this many attempts.
    Attempts(u64),
    /// Workers run until the driver raises the stop flag after this long.
    Duration(Duration),
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationStats {
    pub threads: usize,
    pub attempts: u64,
    pub elapsed: Duration,
}

impl IterationStats {
    /// Average wall time of one attempt as seen by one worker.
    pub fn nanos_per_op(&self) -> f64 {
        if self.attempts == 0 {
            return f64::NAN;
        }
        self.elapsed.as_nanos() as f64 * self.threads as f64 / self.attempts as f64
    }
}

/// One strategy racing on one fresh cell with fresh counters.
///
/// The pool is borrowed so the cell can hand out `&'p Buffer` without
/// copying; it must be prepared anew for every trial.
#[derive(Debug)]
pub struct Trial<'p, S> {
    strategy: S,
    handles: Handles,
    cell: SharedCell<'p>,
}

impl<'p, S: UpdateStrategy> Trial<'p, S> {
    /// Binds handles and points a fresh cell at the pool's initial buffer.
    /// Fails before any worker exists if binding fails.
    pub fn setup(strategy: S, pool: &'p CandidatePool) -> Result<Self, SetupError> {
        let handles = Handles::bind()?;
        let cell = SharedCell::new(pool);
        debug!(
            strategy = S::KIND.name(),
            pool_size = pool.len(),
            buffer_len = pool.initial().len(),
            "trial set up"
        );
        Ok(Self {
            strategy,
            handles,
            cell,
        })
    }

    pub fn cell(&self) -> &SharedCell<'p> {
        &self.cell
    }

    pub fn handles(&self) -> &Handles {
        &self.handles
    }

    /// One measured operation.
    pub fn attempt(&self) -> Result<&'p Buffer, AccessError> {
        strategy::attempt(&self.strategy, &self.handles, &self.cell)
    }

    /// Runs `threads` workers against the cell until `budget` is spent.
    ///
    /// Workers are released together and all joined before this returns.
    /// The first access error stops every worker and is returned.
    pub fn run(&self, threads: usize, budget: Budget) -> TrialResult<IterationStats> {
        if threads == 0 {
            return Err(SetupError::NoWorkers.into());
        }

        let limit = match budget {
            Budget::Attempts(n) => n,
            Budget::Duration(_) => u64::MAX,
        };
        let stop = AtomicBool::new(false);
        let start = Barrier::new(threads + 1);
        let (stop, start) = (&stop, &start);

        let (results, elapsed) = thread::scope(|s| {
            let workers: Vec<_> = (0..threads)
                .map(|_| s.spawn(move || self.worker(start, stop, limit)))
                .collect();

            start.wait();
            let began = Instant::now();
            if let Budget::Duration(duration) = budget {
                thread::sleep(duration);
                stop.store(true, Ordering::Relaxed);
            }
            let results: Vec<_> = workers.into_iter().map(|w| w.join()).collect();
            (results, began.elapsed())
        });

        let mut attempts = 0;
        for result in results {
            match result {
                Ok(Ok(n)) => attempts += n,
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(TrialError::WorkerPanicked),
            }
        }

        let stats = IterationStats {
            threads,
            attempts,
            elapsed,
        };
        debug!(strategy = S::KIND.name(), ?stats, "iteration finished");
        Ok(stats)
    }

    fn worker(&self, start: &Barrier, stop: &AtomicBool, limit: u64) -> Result<u64, AccessError> {
        start.wait();

        let mut attempts = 0;
        while attempts < limit && !stop.load(Ordering::Relaxed) {
            match self.attempt() {
                Ok(value) => {
                    black_box(value);
                    attempts += 1;
                }
                Err(err) => {
                    warn!(strategy = S::KIND.name(), %err, "attempt failed, stopping trial");
                    stop.store(true, Ordering::Relaxed);
                    return Err(err);
                }
            }
        }
        Ok(attempts)
    }

    /// Reads the final tallies and writes the report line to `out`.
    pub fn teardown<W: Write>(self, out: &mut W) -> TrialResult<TrialReport> {
        let report = self.handles.counters().report();
        writeln!(out, "{report}")?;
        debug!(
            strategy = S::KIND.name(),
            successes = report.successes,
            failures = report.failures,
            "trial torn down"
        );
        Ok(report)
    }
}
