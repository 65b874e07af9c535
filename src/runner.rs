//! Standalone driver: warmup and measurement iterations per strategy, one
//! trial per fork, average time per operation.

use crate::buffer::{CandidatePool, DEFAULT_BUFFER_LEN, DEFAULT_POOL_SIZE};
use crate::counters::TrialReport;
use crate::error::{SetupError, TrialResult};
use crate::strategy::{
    HandleCas, HandleReadWrite, LockedRaw, LockedReflective, RawUnsynchronized, Reflective,
    StrategyKind, GROUP,
};
use crate::trial::{Budget, IterationStats, Trial};
use crate::UpdateStrategy;
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_WARMUP_ITERATIONS: u32 = 5;
pub const DEFAULT_MEASUREMENT_ITERATIONS: u32 = 5;
pub const DEFAULT_THREADS: usize = 6;
pub const DEFAULT_FORKS: u32 = 1;
pub const DEFAULT_ITERATION_TIME: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Substring of the qualified benchmark name, e.g. `cas_strategies.locked`.
    pub include: String,
    pub warmup_iterations: u32,
    pub measurement_iterations: u32,
    pub threads: usize,
    /// Independent trials per strategy, each with fresh state. Run in
    /// process; zero behaves like one.
    pub forks: u32,
    pub iteration_time: Duration,
    pub pool_size: usize,
    pub buffer_len: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include: GROUP.to_owned(),
            warmup_iterations: DEFAULT_WARMUP_ITERATIONS,
            measurement_iterations: DEFAULT_MEASUREMENT_ITERATIONS,
            threads: DEFAULT_THREADS,
            forks: DEFAULT_FORKS,
            iteration_time: DEFAULT_ITERATION_TIME,
            pool_size: DEFAULT_POOL_SIZE,
            buffer_len: DEFAULT_BUFFER_LEN,
        }
    }
}

impl RunOptions {
    pub fn builder() -> RunOptionsBuilder {
        RunOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptionsBuilder {
    options: RunOptions,
}

impl RunOptionsBuilder {
    pub fn include(mut self, filter: impl Into<String>) -> Self {
        self.options.include = filter.into();
        self
    }

    pub fn warmup_iterations(mut self, n: u32) -> Self {
        self.options.warmup_iterations = n;
        self
    }

    pub fn measurement_iterations(mut self, n: u32) -> Self {
        self.options.measurement_iterations = n;
        self
    }

    pub fn threads(mut self, n: usize) -> Self {
        self.options.threads = n;
        self
    }

    pub fn forks(mut self, n: u32) -> Self {
        self.options.forks = n;
        self
    }

    pub fn iteration_time(mut self, time: Duration) -> Self {
        self.options.iteration_time = time;
        self
    }

    pub fn pool(mut self, size: usize, buffer_len: usize) -> Self {
        self.options.pool_size = size;
        self.options.buffer_len = buffer_len;
        self
    }

    pub fn build(self) -> Result<RunOptions, SetupError> {
        if self.options.threads == 0 {
            return Err(SetupError::NoWorkers);
        }
        if self.options.pool_size == 0 {
            return Err(SetupError::EmptyPool);
        }
        Ok(self.options)
    }
}

/// Measured iterations and teardown reports of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkResult {
    pub kind: StrategyKind,
    pub iterations: Vec<IterationStats>,
    /// One per fork.
    pub reports: Vec<TrialReport>,
}

impl BenchmarkResult {
    pub const HEADER: &'static str = "Benchmark                                 Mode  Cnt         Score  Units";

    fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            iterations: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn mean_nanos_per_op(&self) -> f64 {
        if self.iterations.is_empty() {
            return f64::NAN;
        }
        let sum: f64 = self.iterations.iter().map(IterationStats::nanos_per_op).sum();
        sum / self.iterations.len() as f64
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<40}  avgt  {:>3}  {:>12.3}  ns/op",
            self.kind.qualified_name(),
            self.iterations.len(),
            self.mean_nanos_per_op()
        )
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    options: RunOptions,
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn selected(&self) -> Vec<StrategyKind> {
        StrategyKind::ALL
            .into_iter()
            .filter(|kind| kind.matches(&self.options.include))
            .collect()
    }

    /// Runs every selected strategy, writing progress and trial reports to
    /// stdout.
    pub fn run(&self) -> TrialResult<Vec<BenchmarkResult>> {
        self.run_with(&mut io::stdout().lock())
    }

    pub fn run_with<W: Write>(&self, out: &mut W) -> TrialResult<Vec<BenchmarkResult>> {
        let selected = self.selected();
        if selected.is_empty() {
            warn!(include = %self.options.include, "no strategy matches the include filter");
        }

        let mut results = Vec::with_capacity(selected.len());
        for kind in selected {
            results.push(self.run_kind(kind, out)?);
        }
        Ok(results)
    }

    fn run_kind<W: Write>(&self, kind: StrategyKind, out: &mut W) -> TrialResult<BenchmarkResult> {
        match kind {
            StrategyKind::Raw => self.run_strategy(RawUnsynchronized, out),
            StrategyKind::LockedRaw => self.run_strategy(LockedRaw, out),
            StrategyKind::Reflective => self.run_strategy(Reflective, out),
            StrategyKind::LockedReflective => self.run_strategy(LockedReflective, out),
            StrategyKind::HandleReadWrite => self.run_strategy(HandleReadWrite, out),
            StrategyKind::HandleCas => self.run_strategy(HandleCas, out),
        }
    }

    fn run_strategy<S: UpdateStrategy, W: Write>(
        &self,
        strategy: S,
        out: &mut W,
    ) -> TrialResult<BenchmarkResult> {
        let o = &self.options;
        let forks = o.forks.max(1);
        let budget = Budget::Duration(o.iteration_time);
        let mut result = BenchmarkResult::new(S::KIND);

        writeln!(out, "# Benchmark: {}", S::KIND.qualified_name())?;
        writeln!(out, "# Threads: {}", o.threads)?;

        for fork in 1..=forks {
            info!(strategy = S::KIND.name(), fork, forks, "starting trial");
            writeln!(out, "# Fork: {fork} of {forks}")?;

            let pool = CandidatePool::prepare(o.pool_size, o.buffer_len)?;
            let trial = Trial::setup(strategy, &pool)?;

            for i in 1..=o.warmup_iterations {
                let stats = trial.run(o.threads, budget)?;
                writeln!(out, "# Warmup Iteration {i:>3}: {:.3} ns/op", stats.nanos_per_op())?;
            }
            for i in 1..=o.measurement_iterations {
                let stats = trial.run(o.threads, budget)?;
                writeln!(out, "Iteration {i:>3}: {:.3} ns/op", stats.nanos_per_op())?;
                result.iterations.push(stats);
            }

            result.reports.push(trial.teardown(out)?);
        }

        info!(
            strategy = S::KIND.name(),
            mean_ns_per_op = result.mean_nanos_per_op(),
            "benchmark finished"
        );
        Ok(result)
    }
}
