use std::mem;
use std::panic::{self, AssertUnwindSafe};

use super::outcome::Outcome;
use super::{check_threads, ThreadPool};
use crate::{PoolError, Result};

type Job<E> = Box<dyn FnOnce() -> std::result::Result<(), E> + Send + 'static>;

/// A thread pool backed by the `rayon` library.
///
/// Jobs are spawned into a rayon scope on a dedicated pool of `threads`
/// threads, so the pool size is the concurrency cap.
pub struct RayonThreadPool<E> {
    pool: rayon::ThreadPool,
    jobs: Vec<Job<E>>,
}

impl<E: Send + 'static> ThreadPool<E> for RayonThreadPool<E> {
    fn new(threads: u32) -> Result<Self> {
        check_threads(threads)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("rayon-pool-worker-{i}"))
            .build()
            .map_err(|e| PoolError::ThreadPoolBuild(e.to_string()))?;
        Ok(RayonThreadPool {
            pool,
            jobs: Vec::new(),
        })
    }

    fn add_task<F>(&mut self, job: F)
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
    {
        self.jobs.push(Box::new(job));
    }

    fn pending(&self) -> usize {
        self.jobs.len()
    }

    fn run_all(&mut self) -> std::result::Result<(), E> {
        let jobs = mem::take(&mut self.jobs);
        if jobs.is_empty() {
            return Ok(());
        }

        let outcome = Outcome::new();
        self.pool.scope(|scope| {
            for job in jobs {
                let outcome = &outcome;
                scope.spawn(move |_| {
                    let worker = rayon::current_thread_index().unwrap_or_default();
                    outcome.record(worker, panic::catch_unwind(AssertUnwindSafe(job)));
                });
            }
        });
        outcome.finish()
    }
}
