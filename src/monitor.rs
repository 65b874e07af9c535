use rustix::thread::futex;
use std::sync::atomic::{AtomicU32, Ordering};

/// A Linux-only monitor lock built on futex.
///
/// Guards no data of its own: it serializes whole compare-and-swap attempts
/// on the shared cell, so everything done while holding a [`MonitorGuard`]
/// happens-before the next holder's critical section.
#[derive(Debug, Default)]
pub struct Monitor {
    futex: AtomicU32,
}

#[derive(Debug)]
pub struct MonitorGuard<'a> {
    monitor: &'a Monitor,
}

impl Monitor {
    // Free to take.
    const UNLOCKED: u32 = 0;
    // Held, nobody is parked. A thread that finds the monitor in this state
    // must move it to `CONTENDED` before parking or it will never be woken.
    const LOCKED: u32 = 1;
    // Held, and at least one thread may be parked on the futex.
    const CONTENDED: u32 = 2;

    const SPIN_LIMIT: u32 = 64;

    pub const fn new() -> Self {
        Self {
            futex: AtomicU32::new(Self::UNLOCKED),
        }
    }

    pub fn lock(&self) -> MonitorGuard<'_> {
        if let Some(guard) = self.try_lock() {
            return guard;
        }
        self.lock_contended()
    }

    pub fn try_lock(&self) -> Option<MonitorGuard<'_>> {
        self.futex
            .compare_exchange(
                Self::UNLOCKED,
                Self::LOCKED,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
            .then(|| MonitorGuard { monitor: self })
    }

    /// Runs `f` while holding the monitor.
    pub fn synchronized<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock();
        f()
    }

    pub fn is_locked(&self) -> bool {
        self.futex.load(Ordering::Relaxed) != Self::UNLOCKED
    }

    fn lock_contended(&self) -> MonitorGuard<'_> {
        loop {
            let state = self.spin();

            // Swapping UNLOCKED -> CONTENDED takes the lock; we cannot know
            // whether others are parked, so we pessimistically keep CONTENDED.
            if state != Self::CONTENDED
                && self.futex.swap(Self::CONTENDED, Ordering::Acquire) == Self::UNLOCKED
            {
                return MonitorGuard { monitor: self };
            }

            let _ = futex::wait(&self.futex, futex::Flags::PRIVATE, Self::CONTENDED, None);
        }
    }

    fn spin(&self) -> u32 {
        let mut spin = Self::SPIN_LIMIT;
        loop {
            let state = self.futex.load(Ordering::Relaxed);
            if state != Self::LOCKED || spin == 0 {
                return state;
            }
            std::hint::spin_loop();
            spin -= 1;
        }
    }

    fn unlock(&self) {
        if self.futex.swap(Self::UNLOCKED, Ordering::Release) == Self::CONTENDED {
            let _ = futex::wake(&self.futex, futex::Flags::PRIVATE, 1);
        }
    }
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        self.monitor.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_uncontended() {
        let m = Monitor::new();
        assert!(!m.is_locked());
        {
            let _g = m.lock();
            assert!(m.is_locked());
            assert!(m.try_lock().is_none());
        }
        assert!(!m.is_locked());
        assert_eq!(m.synchronized(|| 3), 3);
    }

    #[test]
    fn test_contended() {
        const N_THREADS: usize = 32;
        const N_OPS: u64 = 128;

        let m = Monitor::new();
        // Split load/store: only correct if the monitor really excludes.
        let value = AtomicU64::new(0);
        let b = std::sync::Barrier::new(N_THREADS);

        std::thread::scope(|s| {
            for _ in 0..N_THREADS {
                let (m, value, b) = (&m, &value, &b);
                s.spawn(move || {
                    b.wait();

                    for _ in 0..N_OPS {
                        m.synchronized(|| {
                            let v = value.load(Ordering::Relaxed);
                            std::hint::spin_loop();
                            value.store(v + 1, Ordering::Relaxed);
                        });
                    }
                });
            }
        });

        assert_eq!(value.load(Ordering::Relaxed), N_THREADS as u64 * N_OPS);
        assert!(!m.is_locked());
    }
}
