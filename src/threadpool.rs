//! Worker pool and join barrier (component G): fan a batch of per-shard
//! operations (e.g. enumerating every shard on startup, or running
//! `maybe_split` across a whole table) out across worker threads and wait
//! for all of them to finish, translating a worker panic into a regular
//! error rather than poisoning anything.
//!
//! Grounded in the teacher's `scheduling::worker` pool: a fixed-size
//! `rayon` pool for the actual execution, with an explicit atomic-counter
//! join barrier (rather than relying on `rayon::Scope`'s implicit join)
//! so `begin`/`dispatch`/`join` read the same as spec.md §4.G's contract.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::error::StoreError;

/// An atomic-counter join barrier: `begin(n)` arms it for `n` pending
/// completions, `complete_one` ticks it down and wakes any waiter once it
/// reaches zero, `join` blocks until that happens.
pub struct JoinBarrier {
    remaining: AtomicUsize,
    lock: Mutex<()>,
    cond: Condvar,
}

impl JoinBarrier {
    pub fn new() -> Self {
        JoinBarrier { remaining: AtomicUsize::new(0), lock: Mutex::new(()), cond: Condvar::new() }
    }

    pub fn begin(&self, n: usize) {
        self.remaining.store(n, Ordering::SeqCst);
    }

    fn complete_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.lock.lock();
            self.cond.notify_all();
        }
    }

    pub fn join(&self) {
        let mut guard = self.lock.lock();
        while self.remaining.load(Ordering::Acquire) != 0 {
            self.cond.wait(&mut guard);
        }
    }
}

impl Default for JoinBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-size worker pool. Each `dispatch` call fans `targets` out
/// across the pool, applying `work` to each, and does not return until
/// every one has completed (success, error, or panic).
pub struct Pool {
    inner: rayon::ThreadPool,
}

impl Pool {
    pub fn new(threads: usize) -> Result<Pool, StoreError> {
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(Pool { inner })
    }

    /// Run `work` once per element of `targets`, in parallel, returning
    /// each result in the same order `targets` was given (not completion
    /// order). A panicking worker is reported as `StoreError::Io` rather
    /// than propagating and taking down the pool — mirrors
    /// `raddi`'s "exception in worker becomes a failure code, not a crash"
    /// contract.
    pub fn dispatch<T, F>(&self, targets: Vec<T>, work: F) -> Vec<Result<(), StoreError>>
    where
        T: Send,
        F: Fn(T) -> Result<(), StoreError> + Sync,
    {
        let count = targets.len();
        let barrier = JoinBarrier::new();
        barrier.begin(count);

        let (sender, receiver) = crossbeam::channel::unbounded();

        self.inner.scope(|scope| {
            for (index, target) in targets.into_iter().enumerate() {
                let work = &work;
                let barrier = &barrier;
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| work(target))).unwrap_or_else(|_| {
                        Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "worker panicked")))
                    });
                    sender.send((index, outcome)).expect("receiver outlives every sender clone");
                    barrier.complete_one();
                });
            }
            drop(sender);
        });

        barrier.join();

        let mut slots: Vec<Option<Result<(), StoreError>>> = (0..count).map(|_| None).collect();
        for (index, outcome) in receiver.try_iter() {
            slots[index] = Some(outcome);
        }
        slots.into_iter().map(|r| r.expect("every index sent before join returns")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as Counter;
    use std::sync::Arc;

    #[test]
    fn join_barrier_releases_after_all_complete() {
        let barrier = Arc::new(JoinBarrier::new());
        barrier.begin(3);
        for _ in 0..3 {
            barrier.complete_one();
        }
        barrier.join(); // must not block
    }

    #[test]
    fn dispatch_runs_every_target_and_preserves_order() {
        let pool = Pool::new(2).unwrap();
        let counter = Arc::new(Counter::new(0));
        let targets: Vec<usize> = (0..8).collect();
        let results = pool.dispatch(targets, {
            let counter = counter.clone();
            move |i| {
                counter.fetch_add(1, Ordering::SeqCst);
                if i == 4 {
                    Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
                } else {
                    Ok(())
                }
            }
        });
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert_eq!(results.len(), 8);
        assert!(results[4].is_err());
        assert!(results[0].is_ok());
    }

    #[test]
    fn dispatch_survives_a_panicking_worker() {
        let pool = Pool::new(2).unwrap();
        let results = pool.dispatch(vec![1, 2, 3], |i| {
            if i == 2 {
                panic!("synthetic worker failure");
            }
            Ok(())
        });
        assert!(results[1].is_err());
        assert!(results[0].is_ok());
        assert!(results[2].is_ok());
    }
}
