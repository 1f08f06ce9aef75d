#![deny(missing_docs)]

//! A bounded-concurrency task pool.
//!
//! Jobs are queued up front and then drained by a fixed number of workers,
//! so no more than `limit` of them are ever in flight. The async
//! [`TaskPool`] is the main entry point; [`thread_pool`] offers the same
//! contract for blocking jobs, and [`registry`] shows the pool fanning out
//! Docker Registry v2 requests.

mod common;
mod error;
/// Fan-out helpers over a container registry.
pub mod registry;
/// Async bounded task pool.
pub mod task_pool;
/// Thread pool implementations for blocking jobs.
pub mod thread_pool;

pub use common::{MAX_CONCURRENT_REQUESTS, MAX_CONCURRENT_SUBSCRIPTION_REQUESTS, PAGE_SIZE};
pub use error::{PoolError, Result};
pub use registry::{HttpRegistry, RegistryClient, RegistryCredentials, TagInfo};
pub use task_pool::{ErrorMode, PoolConfig, TaskPool};
pub use thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};
