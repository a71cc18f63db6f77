//! # Worker Pool Module
//!
//! Named, bounded rayon pool for generation units.
//!
//! Units are independent: each reads its own table schema and template and
//! produces its own result, so they can be processed in any order. The pool
//! runs them through an indexed parallel iterator, which collects results
//! in the original item order, so callers see the same output as a
//! sequential run.
//!
//! A pool of one worker runs everything on the calling thread and never
//! spawns threads.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Counters for one pool.
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    /// Items handed to a worker
    pub dispatched_count: AtomicU64,
    /// Items finished by a worker
    pub completed_count: AtomicU64,
}

impl WorkerPoolMetrics {
    pub fn record_dispatch(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }
}

/// A named, bounded pool.
///
/// Threads are named `<pool>-<index>` so they show up in thread-aware log
/// output.
#[derive(Debug)]
pub struct WorkerPool {
    name: &'static str,
    num_workers: usize,
    pool: Option<ThreadPool>,
    metrics: WorkerPoolMetrics,
}

impl WorkerPool {
    /// Build a pool of `num_workers` threads (at least one).
    ///
    /// If the threads cannot be spawned the pool logs a warning and runs
    /// sequentially on the caller.
    pub fn new(name: &'static str, num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let pool = if num_workers > 1 {
            match ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .thread_name(move |i| format!("{name}-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!(pool = name, error = %err, "failed to start worker threads, running sequentially");
                    None
                }
            }
        } else {
            None
        };
        Self {
            name,
            num_workers,
            pool,
            metrics: WorkerPoolMetrics::default(),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn metrics(&self) -> &WorkerPoolMetrics {
        &self.metrics
    }

    /// Apply `f` to every item and return the results in item order.
    ///
    /// A panic inside `f` is propagated to the caller.
    pub fn map_ordered<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let run = |item: &T| {
            self.metrics.record_dispatch();
            let result = f(item);
            self.metrics.record_completion();
            result
        };

        match &self.pool {
            Some(pool) if items.len() > 1 => {
                debug!(
                    pool = self.name,
                    workers = self.num_workers,
                    items = items.len(),
                    "dispatching to worker pool"
                );
                pool.install(|| items.par_iter().map(run).collect())
            }
            _ => items.iter().map(run).collect(),
        }
    }
}
