//! Error types for the service clients.

use terra_core::{CredentialError, JobError, JobFailure, JobHandle, RemoteFailure, RetryError};
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single HTTP attempt.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No usable access token
    #[error("Authentication error: {0}")]
    Credentials(#[from] CredentialError),

    /// A corrective action was abandoned before it produced an error of its own
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Message reported by the service, if this is an error response.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl RemoteFailure for ApiError {
    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Failure of a service operation, wrapped with the operation that was attempted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: RetryError<ApiError>,
    },

    #[error("{context}: Job failed: {failure}")]
    JobFailed { context: String, failure: JobFailure },

    /// The poll budget ran out while the job was still running. Not a failure.
    #[error("{context}: CLI timed out waiting for the job to complete. It's still running on the server (job {handle}).")]
    StillRunning { context: String, handle: JobHandle },

    /// Something only the user (or an administrator) can fix.
    #[error("{0}")]
    UserActionable(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wraps the failure of a retried call.
    ///
    /// A call whose corrective action was cancelled counts as cancelled too.
    pub fn remote(context: impl Into<String>, source: RetryError<ApiError>) -> Self {
        if source.is_cancelled() || matches!(source.cause(), Some(ApiError::Cancelled)) {
            return Self::Cancelled;
        }
        Self::Remote {
            context: context.into(),
            source,
        }
    }

    /// Wraps the failure of a job poll.
    pub fn job(context: impl Into<String>, error: JobError<ApiError>) -> Self {
        let context = context.into();
        match error {
            JobError::Submit(source) | JobError::Status { source, .. } => {
                Self::remote(context, source)
            }
            JobError::Cancelled { .. } => Self::Cancelled,
        }
    }

    pub fn user_actionable(message: impl Into<String>) -> Self {
        Self::UserActionable(message.into())
    }

    /// The HTTP status of the underlying error response, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Remote { source, .. } => source.cause().and_then(|e| e.status_code()),
            Self::JobFailed { failure, .. } => failure.status_code,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
