use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the [`TaskPool`](crate::taskpool::TaskPool) for a single unit of work.
///
/// A unit either produces its output or one of these. None of them says
/// anything about the remote operation itself; they describe why the pool
/// could not deliver the unit's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool was already shut down when the unit tried to acquire a slot.
    #[error("task pool is closed")]
    Closed,

    /// The pool was shut down while the unit was waiting or running.
    #[error("task pool was shut down before the task completed")]
    Cancelled,

    /// The runtime aborted the unit before it produced an output.
    #[error("task was aborted by the runtime")]
    Aborted,

    /// The unit panicked. Carries the panic payload when it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// The specific reason a batch did not complete.
///
/// Every failed batch carries exactly one of these inside its
/// [`BatchError`]. Callers that need to react differently to a timeout than
/// to a remote failure match on this value instead of on the outer error.
///
/// # Error Categories
///
/// - [`Operation`] - one unit's remote call returned an error
/// - [`Timeout`] - the batch deadline elapsed before every unit finished
/// - [`Interrupted`] - a unit could not report its outcome at all
/// - [`Enumeration`] - the key universe could not be listed, nothing was dispatched
///
/// # Examples
///
/// ```no_run
/// use fanout::{BatchError, BatchFailure};
///
/// fn describe(error: &BatchError<std::io::Error>) -> String {
///     match error.cause() {
///         BatchFailure::Operation { key, source } => format!("{key}: {source}"),
///         BatchFailure::Timeout { deadline, .. } => format!("gave up after {deadline:?}"),
///         BatchFailure::Interrupted { key, .. } => format!("{key} never reported back"),
///         BatchFailure::Enumeration { source } => format!("listing failed: {source}"),
///     }
/// }
/// ```
///
/// [`Operation`]: BatchFailure::Operation
/// [`Timeout`]: BatchFailure::Timeout
/// [`Interrupted`]: BatchFailure::Interrupted
/// [`Enumeration`]: BatchFailure::Enumeration
#[derive(Debug, Error)]
pub enum BatchFailure<E>
where
    E: StdError + 'static,
{
    /// A single unit's remote operation failed.
    ///
    /// # Fields
    /// - `key`: The key whose operation failed
    /// - `source`: The error returned by the remote collaborator
    #[error("operation on key '{key}' failed: {source}")]
    Operation {
        key: String,
        #[source]
        source: E,
    },

    /// The deadline elapsed before all units completed.
    ///
    /// Units still running keep running against the remote system; only the
    /// wait for them is abandoned.
    ///
    /// # Fields
    /// - `deadline`: The deadline that was exceeded
    /// - `submitted`: Number of units in the batch
    #[error("deadline of {deadline:?} elapsed before all {submitted} units completed")]
    Timeout { deadline: Duration, submitted: usize },

    /// The wait for a unit was interrupted before it reported an outcome.
    ///
    /// # Fields
    /// - `key`: The key of the interrupted unit
    /// - `reason`: Why the pool could not deliver the outcome
    #[error("unit for key '{key}' was interrupted: {reason}")]
    Interrupted {
        key: String,
        #[source]
        reason: PoolError,
    },

    /// Listing the key universe failed before any unit was dispatched.
    #[error("failed to enumerate keys: {source}")]
    Enumeration {
        #[source]
        source: E,
    },
}

/// The single aggregate failure of a batch.
///
/// Whatever went wrong, a batch fails with this one type. The underlying
/// cause is kept as a [`BatchFailure`] and is also exposed through
/// [`std::error::Error::source`], so the original remote error stays
/// reachable for logging and for tests.
///
/// A failed batch may have been partially applied on the remote side:
/// units that completed before the failure are not rolled back.
#[derive(Debug, Error)]
#[error("{operation} failed: {cause}")]
pub struct BatchError<E>
where
    E: StdError + 'static,
{
    operation: &'static str,
    #[source]
    cause: BatchFailure<E>,
}

impl<E> BatchError<E>
where
    E: StdError + 'static,
{
    pub fn new(operation: &'static str, cause: BatchFailure<E>) -> Self {
        Self { operation, cause }
    }

    /// Name of the bulk operation that failed, e.g. `"getting resources"`.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn cause(&self) -> &BatchFailure<E> {
        &self.cause
    }

    pub fn into_cause(self) -> BatchFailure<E> {
        self.cause
    }

    /// Key of the unit that failed, when the failure is attributable to one.
    pub fn key(&self) -> Option<&str> {
        match &self.cause {
            BatchFailure::Operation { key, .. } | BatchFailure::Interrupted { key, .. } => {
                Some(key)
            }
            BatchFailure::Timeout { .. } | BatchFailure::Enumeration { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, BatchFailure::Timeout { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.cause, BatchFailure::Interrupted { .. })
    }

    pub fn is_operation_failure(&self) -> bool {
        matches!(self.cause, BatchFailure::Operation { .. })
    }

    /// The remote collaborator's error, if the batch failed because of one.
    pub fn remote_error(&self) -> Option<&E> {
        match &self.cause {
            BatchFailure::Operation { source, .. } | BatchFailure::Enumeration { source } => {
                Some(source)
            }
            _ => None,
        }
    }
}
