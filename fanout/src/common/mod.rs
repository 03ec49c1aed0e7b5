pub mod errors;

pub use errors::{BatchError, BatchFailure, PoolError};
