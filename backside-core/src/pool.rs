//! Bounded worker pool for the two parallel stages.
//!
//! Each stage builds its own dedicated Rayon pool so a ~5-wide I/O stage and
//! a ~10-wide CPU stage never share threads. `map` returns only after every
//! task has finished, which is the join barrier between stages.

use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to build worker pool '{name}': {reason}")]
pub struct PoolError {
    pub name: &'static str,
    pub reason: String,
}

pub struct WorkerPool {
    name: &'static str,
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(name: &'static str, threads: usize) -> Result<Self, PoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(move |i| format!("{name}-{i}"))
            .build()
            .map_err(|e| PoolError {
                name,
                reason: e.to_string(),
            })?;
        Ok(Self { name, pool })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item on the pool. Output order matches input order.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}
