use std::any::Any;
use std::panic;
use std::sync::{Mutex, PoisonError};
use std::thread;

use log::{error, warn};

/// The settled result of a blocking run: the first error and the first
/// panic any job produced.
pub(super) struct Outcome<E> {
    error: Mutex<Option<E>>,
    panic: Mutex<Option<Box<dyn Any + Send + 'static>>>,
}

impl<E> Outcome<E> {
    pub(super) fn new() -> Self {
        Outcome {
            error: Mutex::new(None),
            panic: Mutex::new(None),
        }
    }

    /// Records how one job ended, as returned by `catch_unwind`.
    pub(super) fn record(&self, worker: usize, result: thread::Result<Result<(), E>>) {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(err);
                } else {
                    warn!("Worker {worker}: job failed after an earlier failure, dropping its error");
                }
            }
            Err(payload) => {
                error!("Worker {worker}: job panicked, continuing");
                self.panic
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(payload);
            }
        }
    }

    /// Resumes the first panic, or returns the first error.
    pub(super) fn finish(self) -> Result<(), E> {
        let panic_payload = self.panic.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Some(payload) = panic_payload {
            panic::resume_unwind(payload);
        }
        match self.error.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
