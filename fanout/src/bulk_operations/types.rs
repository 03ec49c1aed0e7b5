//! Types shared by the batch executor and the bulk strategies.

use std::fmt;
use std::time::Duration;

use crate::common::BatchFailure;

/// Upper bound on how long one batch may wait for its units.
///
/// The bound covers the whole batch, not each unit: one slow unit among many
/// fast ones still times the batch out.
///
/// # Examples
///
/// ```no_run
/// use fanout::Deadline;
/// use std::time::Duration;
///
/// let bounded = Deadline::after(Duration::from_secs(30));
/// assert_eq!(bounded.as_duration(), Some(Duration::from_secs(30)));
///
/// // No configured timeout means waiting indefinitely
/// assert_eq!(Deadline::from_millis(None), Deadline::Unbounded);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Deadline {
    /// Wait for the batch however long it takes
    #[default]
    Unbounded,
    /// Fail the batch once this much time has passed
    After(Duration),
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self::After(duration)
    }

    /// Deadline from an optional millisecond count, the unit used in configuration
    pub fn from_millis(millis: Option<u64>) -> Self {
        millis
            .map(|ms| Self::After(Duration::from_millis(ms)))
            .unwrap_or(Self::Unbounded)
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Unbounded => None,
            Self::After(duration) => Some(*duration),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Self::After(_))
    }
}

impl From<Duration> for Deadline {
    fn from(duration: Duration) -> Self {
        Self::After(duration)
    }
}

impl From<Option<Duration>> for Deadline {
    fn from(duration: Option<Duration>) -> Self {
        duration.map(Self::After).unwrap_or(Self::Unbounded)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::After(duration) => write!(f, "{duration:?}"),
        }
    }
}

/// Lifecycle of one batch.
///
/// `Pending -> Dispatched -> {Complete | TimedOut | Failed}`. Callers only
/// ever observe success or a [`BatchError`](crate::BatchError); the state is
/// reported in the executor's debug log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Dispatched,
    Complete,
    TimedOut,
    Failed,
}

impl BatchState {
    /// Terminal state for a batch that ended with `failure`
    pub fn from_failure<E>(failure: &BatchFailure<E>) -> Self
    where
        E: std::error::Error + 'static,
    {
        match failure {
            BatchFailure::Timeout { .. } => Self::TimedOut,
            _ => Self::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::TimedOut | Self::Failed)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Dispatched => "DISPATCHED",
            Self::Complete => "COMPLETE",
            Self::TimedOut => "TIMED_OUT",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
