use crate::{PoolError, Result};

/// A bounded pool for blocking jobs.
///
/// Same contract as [`TaskPool`](crate::TaskPool), for jobs that block a
/// thread instead of awaiting: queue jobs with `add_task`, then `run_all`
/// runs them on at most `threads` threads and returns once all have run.
/// Failures never stop the drain; the first error is returned at the end.
pub trait ThreadPool<E>: Sized {
    /// Creates a pool that runs at most `threads` jobs at once.
    ///
    /// # Errors
    ///
    /// Returns an error if `threads` is zero or the pool cannot be built.
    fn new(threads: u32) -> Result<Self>;

    /// Queues a job. It does not start until the pool is run.
    fn add_task<F>(&mut self, job: F)
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static;

    /// Number of queued jobs.
    fn pending(&self) -> usize;

    /// Runs every queued job, blocking until all of them have finished.
    ///
    /// # Errors
    ///
    /// Returns the first error a job produced, after the drain.
    ///
    /// # Panics
    ///
    /// A job panic is resumed on the calling thread after the drain.
    fn run_all(&mut self) -> std::result::Result<(), E>;
}

fn check_threads(threads: u32) -> Result<()> {
    if threads == 0 {
        return Err(PoolError::InvalidLimit(threads));
    }
    Ok(())
}

mod outcome;
mod rayon_pool;
mod shared_queue;

pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
