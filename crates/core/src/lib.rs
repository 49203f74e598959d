//! Terra Core - resilient execution of remote control-plane calls.
//!
//! Every request the CLI sends to a platform service goes through the primitives in
//! this crate:
//!
//! - [`retry`] - error classification, retry policies and the [`RetryExecutor`]
//!   (including the bounded one-time recovery path)
//! - [`jobs`] - the [`JobPoller`] that drives asynchronous server-side jobs to a
//!   terminal state
//! - [`credentials`] - the contract used to obtain (and invalidate) access tokens
//!
//! The crate knows nothing about HTTP clients or resource schemas; service crates plug
//! their own error types in through [`retry::RemoteFailure`] and [`retry::Classify`].

pub mod credentials;
pub mod errors;
pub mod jobs;
pub mod retry;

pub use credentials::{CredentialProvider, StaticTokenProvider};
pub use errors::{CredentialError, JobError, PolicyError, RetryError};
pub use jobs::{
    JobFailure, JobHandle, JobPoller, JobStatus, JobSubmission, PollOutcome, StatusKind,
};
pub use retry::{
    Classify, ErrorClass, HttpClassifier, RemoteFailure, RetryExecutor, RetryPolicy, Sleeper,
    TokioSleeper,
};

// Cancellation is part of the executor's public surface.
pub use tokio_util::sync::CancellationToken;
