use std::fmt;

/// Identifier of a job on the server.
///
/// Either assigned by the service or generated by the caller and sent with the submit
/// request, in which case replaying the submit is keyed to the same job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Error details reported by the service for a failed job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFailure {
    pub message: String,
    pub status_code: Option<u16>,
    pub causes: Vec<String>,
}

impl JobFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_causes(mut self, causes: Vec<String>) -> Self {
        self.causes = causes;
        self
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.status_code {
            write!(f, "{} ({})", self.message, code)?;
        } else {
            f.write_str(&self.message)?;
        }
        if !self.causes.is_empty() {
            write!(f, ": {}", self.causes.join("; "))?;
        }
        Ok(())
    }
}

/// Status of a job as reported by one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    Running,
    Succeeded(T),
    Failed(JobFailure),
}

impl<T> JobStatus<T> {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Running => StatusKind::Running,
            Self::Succeeded(_) => StatusKind::Succeeded,
            Self::Failed(_) => StatusKind::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// The poll outcome for a terminal status, `None` while running.
    pub fn into_outcome(self) -> Option<PollOutcome<T>> {
        match self {
            Self::Running => None,
            Self::Succeeded(value) => Some(PollOutcome::Completed(value)),
            Self::Failed(failure) => Some(PollOutcome::RemoteFailure(failure)),
        }
    }
}

/// [`JobStatus`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Running,
    Succeeded,
    Failed,
}

impl StatusKind {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Response to a submit request: the job id plus the status the service reported with it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSubmission<T> {
    pub handle: JobHandle,
    pub status: JobStatus<T>,
}

impl<T> JobSubmission<T> {
    pub fn running(handle: impl Into<JobHandle>) -> Self {
        Self {
            handle: handle.into(),
            status: JobStatus::Running,
        }
    }
}

/// How a poll ended.
///
/// `TimedOut` is not a failure: the job may still finish on the server after the
/// caller has stopped waiting, so it must be reported as unresolved.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Completed(T),
    RemoteFailure(JobFailure),
    TimedOut { handle: JobHandle, checks: u32 },
}
