use std::error::Error as StdError;
use std::future::Future;

use log::{debug, info};

use super::model::{JobHandle, JobStatus, JobSubmission, PollOutcome};
use crate::errors::JobError;
use crate::retry::policy::{DEFAULT_RETRY, STATUS_CHECK_RETRY};
use crate::retry::{Classify, RetryExecutor, RetryPolicy};

/// Drives an asynchronous job from submission to a terminal state.
///
/// Two budgets apply. Every individual request (the submit and each status check) is
/// retried by the executor under its own retry policy, so one flaky status check does
/// not end the poll. The poll policy passed per call bounds how many status checks are
/// made while the job keeps reporting `Running`.
///
/// Polling stops at the first terminal status. A job is never checked again once it
/// has succeeded or failed, so a later contradicting report cannot be observed.
#[derive(Debug, Clone)]
pub struct JobPoller {
    executor: RetryExecutor,
    submit_retry: RetryPolicy,
    status_retry: RetryPolicy,
}

impl JobPoller {
    pub fn new(executor: RetryExecutor) -> Self {
        Self {
            executor,
            submit_retry: DEFAULT_RETRY,
            status_retry: STATUS_CHECK_RETRY,
        }
    }

    pub fn with_submit_retry(mut self, policy: RetryPolicy) -> Self {
        self.submit_retry = policy;
        self
    }

    pub fn with_status_retry(mut self, policy: RetryPolicy) -> Self {
        self.status_retry = policy;
        self
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Submits a job and waits for it under `poll_policy`.
    ///
    /// If the submit response already carries a terminal status, that is the outcome
    /// and no status check is made.
    pub async fn submit_and_await<T, E, C, S, SFut, K, KFut>(
        &self,
        classifier: &C,
        submit: S,
        check_status: K,
        poll_policy: &RetryPolicy,
    ) -> Result<PollOutcome<T>, JobError<E>>
    where
        C: Classify<E> + ?Sized,
        S: FnMut() -> SFut,
        SFut: Future<Output = Result<JobSubmission<T>, E>>,
        K: FnMut(JobHandle) -> KFut,
        KFut: Future<Output = Result<JobStatus<T>, E>>,
        E: StdError + 'static,
    {
        let JobSubmission { handle, status } = self
            .executor
            .execute(&self.submit_retry, classifier, submit)
            .await
            .map_err(JobError::Submit)?;
        debug!("Submitted job {} with status {}", handle, status.kind());

        if let Some(outcome) = status.into_outcome() {
            return Ok(outcome);
        }

        self.poll(classifier, handle, check_status, poll_policy)
            .await
    }

    /// Waits for a job that was submitted elsewhere.
    pub async fn await_job<T, E, C, K, KFut>(
        &self,
        classifier: &C,
        handle: JobHandle,
        check_status: K,
        poll_policy: &RetryPolicy,
    ) -> Result<PollOutcome<T>, JobError<E>>
    where
        C: Classify<E> + ?Sized,
        K: FnMut(JobHandle) -> KFut,
        KFut: Future<Output = Result<JobStatus<T>, E>>,
        E: StdError + 'static,
    {
        self.poll(classifier, handle, check_status, poll_policy)
            .await
    }

    async fn poll<T, E, C, K, KFut>(
        &self,
        classifier: &C,
        handle: JobHandle,
        mut check_status: K,
        poll_policy: &RetryPolicy,
    ) -> Result<PollOutcome<T>, JobError<E>>
    where
        C: Classify<E> + ?Sized,
        K: FnMut(JobHandle) -> KFut,
        KFut: Future<Output = Result<JobStatus<T>, E>>,
        E: StdError + 'static,
    {
        let max_checks = poll_policy.max_attempts();
        let mut checks: u32 = 0;

        loop {
            if self.executor.cancellation_token().is_cancelled() {
                return Err(JobError::Cancelled { handle, checks });
            }

            checks += 1;
            let checked = self
                .executor
                .execute(&self.status_retry, classifier, || {
                    check_status(handle.clone())
                })
                .await;
            let status = match checked {
                Ok(status) => status,
                Err(source) => return Err(JobError::Status { handle, source }),
            };

            if let Some(outcome) = status.into_outcome() {
                debug!("Job {} reached a terminal state after {} checks", handle, checks);
                return Ok(outcome);
            }

            if checks >= max_checks {
                info!(
                    "Job {} still running after {} status checks; no longer waiting",
                    handle, checks
                );
                return Ok(PollOutcome::TimedOut { handle, checks });
            }

            debug!("Job {} still running ({}/{})", handle, checks, max_checks);
            if !self.executor.pause(poll_policy.interval()).await {
                return Err(JobError::Cancelled { handle, checks });
            }
        }
    }
}
