use anyhow::Context;
use contended_cas::strategy::GROUP;
use contended_cas::{BenchmarkResult, RunOptions, Runner};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    // Optional include filter, e.g. `cas_strategies.locked`.
    let include = std::env::args().nth(1).unwrap_or_else(|| GROUP.to_owned());

    let options = RunOptions::builder()
        .include(include)
        .warmup_iterations(5)
        .measurement_iterations(5)
        .threads(6)
        .forks(1)
        .build()
        .context("invalid run options")?;

    tracing::info!(?options, "starting contention run");
    let results = Runner::new(options).run().context("benchmark run failed")?;

    println!();
    println!("{}", BenchmarkResult::HEADER);
    for result in &results {
        println!("{result}");
    }
    Ok(())
}
