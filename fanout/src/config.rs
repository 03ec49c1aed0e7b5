//! Configuration for batch deadlines and pool sizing.
//!
//! Values come from an optional TOML file overlaid with `FANOUT__*`
//! environment variables, e.g. `FANOUT__REQUEST_TIMEOUT_MS=30000`.

use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;

use crate::bulk_operations::Deadline;
use crate::taskpool::TaskPool;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load batch configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Configuration for bulk operations.
///
/// Every field is optional; accessors fall back to defaults.
///
/// ```toml
/// # Deadline for a whole batch in milliseconds; omit to wait indefinitely
/// request_timeout_ms = 30000
/// # Number of units allowed to run at once
/// user_threads = 16
/// ```
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Deadline for a whole batch in milliseconds (default: unbounded)
    request_timeout_ms: Option<u64>,
    /// Pool capacity (default: available parallelism, or 10 if unknown)
    user_threads: Option<usize>,
}

impl BatchConfig {
    pub const ENV_PREFIX: &'static str = "FANOUT";

    pub fn new(request_timeout_ms: Option<u64>, user_threads: Option<usize>) -> Self {
        Self {
            request_timeout_ms,
            user_threads,
        }
    }

    /// Load configuration from `path` (if given) and the environment.
    ///
    /// Environment variables override file values.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or malformed, or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(Self::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<BatchConfig>()?;

        log::debug!("Loaded batch configuration: {config:?}");
        Ok(config)
    }

    pub fn request_timeout_ms(&self) -> Option<u64> {
        self.request_timeout_ms
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::from_millis(self.request_timeout_ms)
    }

    pub fn user_threads(&self) -> usize {
        self.user_threads
            .filter(|threads| *threads > 0)
            .unwrap_or_else(default_user_threads)
    }

    /// Create a task pool sized by [`user_threads`](Self::user_threads)
    pub fn build_pool(&self) -> TaskPool {
        TaskPool::new(self.user_threads())
    }
}

fn default_user_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(10)
}
