use crate::{PoolError, Result};

/// What a run does once a job has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Keep draining: every queued job still runs and the first error is
    /// returned once all workers are done.
    #[default]
    Drain,
    /// Stop taking new jobs, abort jobs still in flight and discard the
    /// rest of the queue.
    FailFast,
}

/// Settings for a [`TaskPool`](super::TaskPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub(crate) limit: u32,
    pub(crate) error_mode: ErrorMode,
}

impl PoolConfig {
    /// A config allowing at most `limit` jobs in flight, draining on error.
    pub fn new(limit: u32) -> Self {
        PoolConfig {
            limit,
            error_mode: ErrorMode::Drain,
        }
    }

    /// Sets the error mode.
    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// The configured concurrency limit.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(PoolError::InvalidLimit(self.limit));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig::new(num_cpus::get() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_drain_with_one_worker_per_cpu() {
        let config = PoolConfig::default();
        assert_eq!(config.error_mode, ErrorMode::Drain);
        assert_eq!(config.limit(), num_cpus::get() as u32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = PoolConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, PoolError::InvalidLimit(0)));
    }

    #[test]
    fn error_mode_is_overridable() {
        let config = PoolConfig::new(4).error_mode(ErrorMode::FailFast);
        assert_eq!(config.error_mode, ErrorMode::FailFast);
        assert_eq!(config.limit(), 4);
    }
}
