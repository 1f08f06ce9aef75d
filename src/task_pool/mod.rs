use std::future::Future;
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use log::{debug, error};
use tokio::task::JoinSet;

use self::worker::{Job, Shared};
use crate::Result;

mod config;
mod worker;

pub use self::config::{ErrorMode, PoolConfig};

/// Boxed error type used when a pool's error type is left at its default.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Runs a batch of async jobs with at most `limit` of them in flight.
///
/// Jobs are queued with [`add_task`](TaskPool::add_task) and executed by
/// [`run_all`](TaskPool::run_all), which starts `min(limit, pending)`
/// workers. Each worker takes one job off the shared queue, awaits it, and
/// repeats until the queue is empty. The run finishes once every worker has.
///
/// Jobs are taken in FIFO order, but with more than one worker they may
/// start and finish in any order. Callers must not rely on ordering.
///
/// There is no timeout and no retry. A job that never completes holds its
/// worker forever, and the run never finishes.
///
/// A pool is meant to be filled and run once. Running it again only runs
/// whatever was added since; with nothing added it returns immediately.
///
/// # Examples
///
/// ```no_run
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use asyncpool::TaskPool;
///
/// # async fn demo() -> asyncpool::Result<()> {
/// let hits = Arc::new(AtomicUsize::new(0));
/// let mut pool: TaskPool<(), std::io::Error> = TaskPool::new(8)?;
/// for _ in 0..100 {
///     let hits = Arc::clone(&hits);
///     pool.add_task(move || async move {
///         hits.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     });
/// }
/// pool.run_all().await?;
/// assert_eq!(hits.load(Ordering::SeqCst), 100);
/// # Ok(())
/// # }
/// ```
pub struct TaskPool<T = (), E = BoxError> {
    config: PoolConfig,
    queue: Arc<SegQueue<Job<T, E>>>,
}

impl<T, E> TaskPool<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates an empty pool running at most `limit` jobs at once.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidLimit`](crate::PoolError::InvalidLimit)
    /// if `limit` is zero.
    pub fn new(limit: u32) -> Result<Self> {
        Self::with_config(PoolConfig::new(limit))
    }

    /// Creates an empty pool from a full config.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(TaskPool {
            config,
            queue: Arc::new(SegQueue::new()),
        })
    }

    /// Queues a job. It does not start until the pool is run.
    pub fn add_task<F, Fut>(&mut self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        self.queue.push(Box::new(move || Box::pin(job())));
    }

    /// Number of queued jobs not yet taken by a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The concurrency limit.
    pub fn limit(&self) -> u32 {
        self.config.limit
    }

    /// Number of workers the next run starts.
    pub fn workers(&self) -> usize {
        (self.config.limit as usize).min(self.pending())
    }

    /// Runs every queued job and waits for all of them.
    ///
    /// # Errors
    ///
    /// Returns the first error a job produced. In [`ErrorMode::Drain`] the
    /// error is only returned after every other job has run; later errors
    /// are logged and dropped.
    ///
    /// # Panics
    ///
    /// If a job panics, the panic is resumed here once the run has settled.
    pub async fn run_all(&mut self) -> std::result::Result<(), E> {
        self.collect().await.map(drop)
    }

    /// Like [`run_all`](TaskPool::run_all), but hands back every successful
    /// job's output. Outputs come back in no particular order.
    pub async fn collect(&mut self) -> std::result::Result<Vec<T>, E> {
        let pending = self.pending();
        let workers = self.workers();
        if workers == 0 {
            return Ok(Vec::new());
        }
        debug!("Draining {pending} jobs with {workers} workers");

        let shared = Arc::new(Shared::new(
            Arc::clone(&self.queue),
            self.config.error_mode,
        ));
        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker::run(id, Arc::clone(&shared)));
        }

        let mut outputs = Vec::with_capacity(pending);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(worker_outputs) => outputs.extend(worker_outputs),
                Err(err) if err.is_panic() => {
                    error!("Worker task panicked");
                    shared.record_panic(err.into_panic());
                }
                // Aborted after a fail-fast halt.
                Err(_) => {}
            }
            if shared.is_halted() {
                set.abort_all();
            }
        }

        if shared.is_halted() {
            let mut discarded = 0;
            while self.queue.pop().is_some() {
                discarded += 1;
            }
            debug!("Run halted, discarded {discarded} queued jobs");
        }

        if let Some(payload) = shared.take_panic() {
            std::panic::resume_unwind(payload);
        }
        match shared.take_error() {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }
}
