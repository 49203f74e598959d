//! Asynchronous server-side jobs.
//!
//! Control-plane services run slow operations (creating a cloud context, deleting a
//! bucket) as jobs: the submit request returns a job id right away and the caller polls
//! a status endpoint until the job reaches a terminal state.
//!
//! - **Models** (`model.rs`) - `JobHandle`, `JobStatus`, `JobFailure`, `PollOutcome`
//! - **Poller** (`poller.rs`) - submit + poll loop on top of the retry executor

pub mod model;
pub mod poller;

#[cfg(test)]
mod poller_tests;

pub use model::{JobFailure, JobHandle, JobStatus, JobSubmission, PollOutcome, StatusKind};
pub use poller::JobPoller;
