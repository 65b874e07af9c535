use crate::access::{lookup, Projection};
use crate::buffer::Buffer;
use crate::cell::SharedCell;
use crate::error::SetupError;
use std::fmt;
use std::sync::atomic::Ordering;

/// Atomic access to a buffer field, resolved once by name and type.
#[derive(Clone, Copy)]
pub struct AtomicHandle {
    field: &'static str,
    project: Projection,
}

impl AtomicHandle {
    pub fn bind(name: &str) -> Result<Self, SetupError> {
        let field = lookup(name)?;
        field.expect::<Buffer>("Buffer")?;
        let project = field
            .project
            .ok_or(SetupError::NotAtomic { field: field.name })?;

        Ok(Self {
            field: field.name,
            project,
        })
    }

    /// Plain-mode read: atomic, but orders nothing around it.
    pub fn get<'p>(&self, cell: &SharedCell<'p>) -> &'p Buffer {
        (self.project)(cell).load(Ordering::Relaxed)
    }

    /// Plain-mode write.
    pub fn set<'p>(&self, cell: &SharedCell<'p>, value: &'p Buffer) {
        (self.project)(cell).store(value, Ordering::Relaxed);
    }

    /// Replaces the field with `new` only if it still holds `expected`, as a
    /// single indivisible operation.
    pub fn compare_and_set<'p>(
        &self,
        cell: &SharedCell<'p>,
        expected: &'p Buffer,
        new: &'p Buffer,
    ) -> bool {
        (self.project)(cell).compare_and_set(expected, new, Ordering::AcqRel, Ordering::Acquire)
    }
}

impl fmt::Debug for AtomicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicHandle")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CandidatePool;

    #[test]
    fn test_bind_checks_type() {
        assert_eq!(
            AtomicHandle::bind("pool").unwrap_err(),
            SetupError::TypeMismatch {
                field: "pool",
                expected: "Buffer",
                actual: "CandidatePool",
            }
        );
        assert!(matches!(
            AtomicHandle::bind("nope"),
            Err(SetupError::NoSuchField { .. })
        ));
    }

    #[test]
    fn test_get_set() {
        let pool = CandidatePool::prepare(3, 2).unwrap();
        let cell = SharedCell::new(&pool);
        let handle = AtomicHandle::bind("current").unwrap();

        assert!(handle.get(&cell).same(pool.initial()));
        handle.set(&cell, pool.get(1).unwrap());
        assert!(cell.read().same(pool.get(1).unwrap()));
    }

    #[test]
    fn test_compare_and_set() {
        let pool = CandidatePool::prepare(3, 2).unwrap();
        let cell = SharedCell::new(&pool);
        let handle = AtomicHandle::bind("current").unwrap();
        let (a, b) = (pool.get(0).unwrap(), pool.get(1).unwrap());

        assert!(!handle.compare_and_set(&cell, a, b));
        assert!(cell.read().same(pool.initial()));
        assert!(handle.compare_and_set(&cell, pool.initial(), a));
        assert!(cell.read().same(a));
    }

    #[test]
    fn test_contended_compare_and_set_has_one_winner() {
        const N_THREADS: usize = 16;

        let pool = CandidatePool::prepare(2, 1).unwrap();
        let cell = SharedCell::new(&pool);
        let handle = AtomicHandle::bind("current").unwrap();
        let b = std::sync::Barrier::new(N_THREADS);
        let (pool, cell, b) = (&pool, &cell, &b);

        let winners: usize = std::thread::scope(|s| {
            let workers: Vec<_> = (0..N_THREADS)
                .map(|_| {
                    s.spawn(move || {
                        b.wait();
                        handle.compare_and_set(cell, pool.initial(), pool.get(0).unwrap())
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|w| usize::from(w.join().unwrap()))
                .sum()
        });

        assert_eq!(winners, 1);
    }
}
