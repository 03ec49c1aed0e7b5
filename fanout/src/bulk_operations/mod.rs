//! Bulk operations module for fanning per-key remote calls out over a task pool
//!
//! - `types`: Deadline and batch lifecycle types
//! - `executor`: The generic batch executor every strategy is built on
//! - `lister`: Fetch resources by key, optionally enumerating and filtering keys first
//! - `deleter`: Delete every resource in a list of names

pub mod deleter;
pub mod executor;
pub mod lister;
pub mod types;

pub use deleter::{DeleteAllInList, ResourceDeleter};
pub use executor::{BatchExecutor, execute_batch};
pub use lister::{KeySource, ListResources};
pub use types::{BatchState, Deadline};
