use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam::queue::SegQueue;
use futures::FutureExt;
use log::{debug, error, warn};

use super::ErrorMode;

pub(crate) type JobFuture<T, E> =
    Pin<Box<dyn Future<Output = std::result::Result<T, E>> + Send + 'static>>;

/// A queued job: called once, then awaited.
pub(crate) type Job<T, E> = Box<dyn FnOnce() -> JobFuture<T, E> + Send + 'static>;

type PanicPayload = Box<dyn Any + Send + 'static>;

/// State shared by every worker of one run.
pub(crate) struct Shared<T, E> {
    queue: Arc<SegQueue<Job<T, E>>>,
    mode: ErrorMode,
    halted: AtomicBool,
    first_error: Mutex<Option<E>>,
    first_panic: Mutex<Option<PanicPayload>>,
}

impl<T, E> Shared<T, E> {
    pub(crate) fn new(queue: Arc<SegQueue<Job<T, E>>>, mode: ErrorMode) -> Self {
        Shared {
            queue,
            mode,
            halted: AtomicBool::new(false),
            first_error: Mutex::new(None),
            first_panic: Mutex::new(None),
        }
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    pub(crate) fn take_error(&self) -> Option<E> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn take_panic(&self) -> Option<PanicPayload> {
        self.first_panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn on_failure(&self) {
        if self.mode == ErrorMode::FailFast {
            self.halted.store(true, Ordering::Release);
        }
    }

    fn record_error(&self, id: usize, err: E) {
        self.on_failure();
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            debug!("Worker {id}: job failed");
            *slot = Some(err);
        } else {
            warn!("Worker {id}: job failed after an earlier failure, dropping its error");
        }
    }

    pub(crate) fn record_panic(&self, payload: PanicPayload) {
        self.on_failure();
        self.first_panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(payload);
    }
}

/// Pulls jobs off the shared queue until it is empty (or the run halts),
/// returning the outputs of the jobs that succeeded.
pub(crate) async fn run<T, E>(id: usize, shared: Arc<Shared<T, E>>) -> Vec<T> {
    debug!("Worker {id} started");
    let mut outputs = Vec::new();

    while !shared.is_halted() {
        let Some(job) = shared.queue.pop() else {
            break;
        };

        match AssertUnwindSafe(async move { job().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => outputs.push(output),
            Ok(Err(err)) => shared.record_error(id, err),
            Err(payload) => {
                error!("Worker {id}: job panicked");
                shared.record_panic(payload);
            }
        }
    }

    debug!("Worker {id} exiting after {} successful jobs", outputs.len());
    outputs
}
