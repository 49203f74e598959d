//! Error types for the execution core.
//!
//! The executor wraps whatever error type the remote operation produces; it never
//! converts it to a string, so callers can still inspect status codes and bodies.

use std::error::Error as StdError;

use thiserror::Error;

use crate::jobs::JobHandle;

/// Failure of an operation run through the [`RetryExecutor`](crate::RetryExecutor).
///
/// Every variant records how many times the operation was invoked. All variants except
/// `Cancelled` carry the underlying cause; a cancelled call carries the last transient
/// error if one was seen.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: StdError + 'static,
{
    /// The error was not retryable.
    #[error("request failed: {source}")]
    Fatal {
        attempts: u32,
        #[source]
        source: E,
    },

    /// Every attempt failed with a transient error.
    #[error("request with retries timed out after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The one-time corrective action failed; the original operation was not replayed.
    #[error("recovery action failed: {source}")]
    RecoveryFailed {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The cancellation token fired before the operation completed.
    #[error("request cancelled after {attempts} attempts")]
    Cancelled {
        attempts: u32,
        last_error: Option<E>,
    },
}

impl<E> RetryError<E>
where
    E: StdError + 'static,
{
    /// Number of times the operation itself was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Fatal { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::RecoveryFailed { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// The underlying error, if any.
    pub fn cause(&self) -> Option<&E> {
        match self {
            Self::Fatal { source, .. }
            | Self::Exhausted { source, .. }
            | Self::RecoveryFailed { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    pub fn into_cause(self) -> Option<E> {
        match self {
            Self::Fatal { source, .. }
            | Self::Exhausted { source, .. }
            | Self::RecoveryFailed { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Adds invocations made before this error's executor took over.
    pub(crate) fn with_prior_attempts(self, prior: u32) -> Self {
        match self {
            Self::Fatal { attempts, source } => Self::Fatal {
                attempts: attempts + prior,
                source,
            },
            Self::Exhausted { attempts, source } => Self::Exhausted {
                attempts: attempts + prior,
                source,
            },
            Self::RecoveryFailed { attempts, source } => Self::RecoveryFailed {
                attempts: attempts + prior,
                source,
            },
            Self::Cancelled {
                attempts,
                last_error,
            } => Self::Cancelled {
                attempts: attempts + prior,
                last_error,
            },
        }
    }
}

/// Failure of a [`JobPoller`](crate::JobPoller) call.
///
/// A job that is still running when the poll budget runs out is *not* an error; see
/// [`PollOutcome::TimedOut`](crate::PollOutcome::TimedOut).
#[derive(Debug, Error)]
pub enum JobError<E>
where
    E: StdError + 'static,
{
    #[error("failed to submit job: {0}")]
    Submit(#[source] RetryError<E>),

    #[error("failed to check the status of job {handle}: {source}")]
    Status {
        handle: JobHandle,
        #[source]
        source: RetryError<E>,
    },

    #[error("cancelled while waiting for job {handle} after {checks} status checks")]
    Cancelled { handle: JobHandle, checks: u32 },
}

impl<E> JobError<E>
where
    E: StdError + 'static,
{
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Submit(source) | Self::Status { source, .. } => source.is_cancelled(),
        }
    }
}

/// Errors from a [`CredentialProvider`](crate::CredentialProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No credentials available: {0}")]
    Missing(String),

    #[error("Access token was rejected by the server; log in again")]
    Stale,
}

/// Invalid retry policy values.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
}
