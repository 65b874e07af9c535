use contended_cas::{
    AccessError, Budget, CandidatePool, HandleCas, HandleReadWrite, Handles, LockedRaw,
    LockedReflective, RaceAudit, RawUnsynchronized, Reflective, SharedCell, Trial, TrialReport,
    UpdateStrategy,
};
use proptest::prelude::*;

fn conserves_counts<S: UpdateStrategy>(strategy: S, threads: usize, attempts: u64) {
    let pool = CandidatePool::standard();
    let trial = Trial::setup(strategy, &pool).unwrap();
    let stats = trial.run(threads, Budget::Attempts(attempts)).unwrap();

    let report = trial.handles().counters().report();
    assert_eq!(stats.attempts, threads as u64 * attempts, "{}", S::KIND);
    assert_eq!(report.total(), stats.attempts, "{}", S::KIND);
    assert!(pool.contains(trial.cell().read()), "{}", S::KIND);
}

#[test]
fn counters_are_conserved_for_every_strategy() {
    for threads in [1, 2, 6] {
        conserves_counts(RawUnsynchronized, threads, 5_000);
        conserves_counts(LockedRaw, threads, 5_000);
        conserves_counts(Reflective, threads, 5_000);
        conserves_counts(LockedReflective, threads, 5_000);
        conserves_counts(HandleReadWrite, threads, 5_000);
        conserves_counts(HandleCas, threads, 5_000);
    }
}

fn never_double_claims<S: UpdateStrategy>(strategy: S) {
    let audit = RaceAudit::new(8, 5_000).unwrap();
    let report = audit.run(strategy).unwrap();

    assert!(report.counts_conserved(), "{report:?}");
    assert!(report.is_race_free(), "{report:?}");
    assert!(report.final_in_pool, "{report:?}");
}

/// On the three-buffer pool the first swap to reach the cell always finds
/// the initial buffer there, so a linearizable strategy cannot fail every
/// attempt.
fn wins_on_standard_pool<S: UpdateStrategy>(strategy: S) {
    let pool = CandidatePool::standard();
    let trial = Trial::setup(strategy, &pool).unwrap();
    let stats = trial.run(8, Budget::Attempts(5_000)).unwrap();

    let report = trial.handles().counters().report();
    assert!(report.successes >= 1, "{}: {report}", S::KIND);
    assert_eq!(report.total(), stats.attempts, "{}", S::KIND);
    assert!(pool.contains(trial.cell().read()), "{}", S::KIND);
}

#[test]
fn linearizable_strategies_never_lose_updates() {
    never_double_claims(LockedRaw);
    never_double_claims(LockedReflective);
    never_double_claims(HandleCas);

    wins_on_standard_pool(LockedRaw);
    wins_on_standard_pool(LockedReflective);
    wins_on_standard_pool(HandleCas);
}

fn exposes_lost_update<S: UpdateStrategy>(strategy: S) {
    const ROUNDS: usize = 64;

    let audit = RaceAudit::new(8, 20_000).unwrap();
    for _ in 0..ROUNDS {
        let report = audit.run(strategy).unwrap();
        assert!(report.counts_conserved(), "{report:?}");
        assert!(report.final_in_pool, "{report:?}");
        if !report.is_race_free() {
            return;
        }
    }
    panic!("{} never lost an update in {ROUNDS} rounds", S::KIND);
}

#[test]
fn raw_strategy_race_is_reproducible() {
    exposes_lost_update(RawUnsynchronized);
}

#[test]
fn handle_read_write_race_is_reproducible() {
    exposes_lost_update(HandleReadWrite);
}

fn single_worker<S: UpdateStrategy>(strategy: S, k: u64) -> Result<(), TestCaseError> {
    let pool = CandidatePool::standard();
    let trial = Trial::setup(strategy, &pool).unwrap();
    trial.run(1, Budget::Attempts(k)).unwrap();

    let counters = trial.handles().counters();
    prop_assert_eq!(counters.successes(), k);
    prop_assert_eq!(counters.failures(), 0);
    let expected = pool.get(((k - 1) % 3) as usize).unwrap();
    prop_assert!(trial.cell().read().same(expected));
    Ok(())
}

fn failed_compare<S: UpdateStrategy>(
    strategy: S,
    current: usize,
    expected: usize,
    new: usize,
) -> Result<(), TestCaseError> {
    let pool = CandidatePool::prepare(3, 32).unwrap();
    let cell = SharedCell::new(&pool);
    let handles = Handles::bind().unwrap();
    let (current, expected, new) = (
        pool.get(current).unwrap(),
        pool.get(expected).unwrap(),
        pool.get(new).unwrap(),
    );
    cell.write(current);

    let out = strategy.execute(&handles, &cell, expected, new).unwrap();
    prop_assert!(out.same(expected));
    prop_assert!(cell.read().same(current));
    prop_assert_eq!(
        handles.counters().report(),
        TrialReport {
            successes: 0,
            failures: 1,
        }
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn single_worker_is_deterministic(k in 1_u64..300) {
        single_worker(RawUnsynchronized, k)?;
        single_worker(LockedRaw, k)?;
        single_worker(Reflective, k)?;
        single_worker(LockedReflective, k)?;
        single_worker(HandleReadWrite, k)?;
        single_worker(HandleCas, k)?;
    }

    #[test]
    fn failed_compare_leaves_cell_unchanged(
        current in 0_usize..3,
        offset in 1_usize..3,
        new in 0_usize..3,
    ) {
        let expected = (current + offset) % 3;
        failed_compare(RawUnsynchronized, current, expected, new)?;
        failed_compare(LockedRaw, current, expected, new)?;
        failed_compare(Reflective, current, expected, new)?;
        failed_compare(LockedReflective, current, expected, new)?;
        failed_compare(HandleReadWrite, current, expected, new)?;
        failed_compare(HandleCas, current, expected, new)?;
    }
}

#[test]
fn teardown_report_format() {
    let report = TrialReport {
        successes: 7,
        failures: 3,
    };
    assert_eq!(report.to_string(), "<<<Passed: 7. Failed: 3. Total: 10>>>");
}

#[test]
fn setup_failure_happens_before_any_worker() {
    assert!(Handles::bind_field("data").is_err());
    assert!(CandidatePool::prepare(0, 1).is_err());
}

#[test]
fn access_error_message_names_the_field() {
    let err = AccessError::ReadOnly { field: "pool" };
    assert_eq!(err.to_string(), "field 'pool' is read-only");
}
