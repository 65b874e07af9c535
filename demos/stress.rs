use contended_cas::{HandleCas, HandleReadWrite, LockedRaw, RaceAudit, RawUnsynchronized};

fn main() {
    const N_ITER: usize = 64;
    const N_THREADS: usize = 8;
    const N_OPS: usize = 20_000;

    let audit = RaceAudit::new(N_THREADS, N_OPS).expect("audit setup failed");
    let mut lost = [0u64; 2];

    for i in 0..N_ITER {
        let racy = [
            audit.run(RawUnsynchronized).expect("raw round failed"),
            audit.run(HandleReadWrite).expect("handle round failed"),
        ];
        for (total, report) in lost.iter_mut().zip(&racy) {
            assert!(report.counts_conserved());
            *total += report.duplicate_claims;
        }

        for report in [
            audit.run(LockedRaw).expect("locked round failed"),
            audit.run(HandleCas).expect("cas round failed"),
        ] {
            assert!(report.is_race_free(), "{report:?}");
        }

        println!(
            "{i}: raw lost {}, handle_read_write lost {}",
            racy[0].duplicate_claims, racy[1].duplicate_claims
        );
    }

    println!("lost updates: raw {}, handle_read_write {}", lost[0], lost[1]);
}
