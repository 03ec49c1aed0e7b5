//! # Fanout
//!
//! Bulk concurrent fan-out of per-key remote operations. Given a list of
//! resource keys and a single-key operation (fetch, delete, ...), the crate
//! submits one unit of work per key to a shared [`taskpool::TaskPool`], waits
//! for all of them under an optional deadline and returns either every result
//! in input order or one aggregate [`common::BatchError`].
//!
//! ## Modules
//!
//! - [`bulk_operations`] - The batch executor and the list/delete strategies built on it
//! - [`common`] - Error types shared across the crate
//! - [`config`] - Layered configuration for deadlines and pool sizing
//! - [`diagnostics`] - Injectable trace sink used for per-batch diagnostics
//! - [`taskpool`] - Task pool for running units of work concurrently

pub mod bulk_operations;
pub mod common;
pub mod config;
pub mod diagnostics;
pub mod taskpool;

pub use bulk_operations::{
    BatchExecutor, BatchState, Deadline, DeleteAllInList, KeySource, ListResources,
    ResourceDeleter, execute_batch,
};
pub use common::{BatchError, BatchFailure, PoolError};
pub use config::{BatchConfig, ConfigError};
pub use diagnostics::{DiagnosticSink, LogSink, NullSink};
pub use taskpool::{PendingHandle, TaskPool};
