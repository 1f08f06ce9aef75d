use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error};

use super::outcome::Outcome;
use super::{check_threads, ThreadPool};
use crate::Result;

type Job<E> = Box<dyn FnOnce() -> std::result::Result<(), E> + Send + 'static>;

/// A thread pool using a shared job queue.
///
/// Each run spawns up to `threads` scoped worker threads that pull jobs
/// from a single MPMC channel until it is empty. A panicking job does not
/// take its worker down with it.
pub struct SharedQueueThreadPool<E> {
    threads: u32,
    tx: Sender<Job<E>>,
    rx: Receiver<Job<E>>,
}

impl<E: Send + 'static> ThreadPool<E> for SharedQueueThreadPool<E> {
    fn new(threads: u32) -> Result<Self> {
        check_threads(threads)?;
        let (tx, rx) = channel::unbounded::<Job<E>>();
        Ok(SharedQueueThreadPool { threads, tx, rx })
    }

    fn add_task<F>(&mut self, job: F)
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
    {
        // Both ends live in `self`, so the channel is never disconnected.
        let _ = self.tx.send(Box::new(job));
    }

    fn pending(&self) -> usize {
        self.rx.len()
    }

    fn run_all(&mut self) -> std::result::Result<(), E> {
        let workers = (self.threads as usize).min(self.rx.len());
        if workers == 0 {
            return Ok(());
        }

        let outcome = Outcome::new();
        thread::scope(|scope| {
            let mut spawned = 0;
            for id in 0..workers {
                let rx = self.rx.clone();
                let outcome = &outcome;
                let handle = thread::Builder::new()
                    .name(format!("pool-worker-{id}"))
                    .spawn_scoped(scope, move || drain(id, &rx, outcome));
                match handle {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        error!("Failed to spawn worker {id}: {e}");
                        break;
                    }
                }
            }
            // Without any worker thread, drain on the caller instead of hanging.
            if spawned == 0 {
                drain(0, &self.rx, &outcome);
            }
        });
        outcome.finish()
    }
}

/// Pulls jobs from the receiver until the queue is empty.
fn drain<E>(id: usize, rx: &Receiver<Job<E>>, outcome: &Outcome<E>) {
    debug!("Worker {id} started");
    while let Ok(job) = rx.try_recv() {
        // Catch panics so the worker loop continues
        outcome.record(id, panic::catch_unwind(AssertUnwindSafe(job)));
    }
    debug!("Worker {id}: queue empty, shutting down");
}
