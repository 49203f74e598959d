//! Tests for the JobPoller.
//!
//! Status sequences are scripted per test; the sleeper records every wait so the tests
//! can assert both the number of status checks and the number of sleeps.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::{ready, Ready};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::errors::{JobError, RetryError};
    use crate::jobs::{
        JobFailure, JobHandle, JobPoller, JobStatus, JobSubmission, PollOutcome,
    };
    use crate::retry::{ErrorClass, RetryExecutor, RetryPolicy, Sleeper};

    // =========================================================================
    // Mocks
    // =========================================================================

    #[derive(Debug, Clone, PartialEq, thiserror::Error)]
    enum ServiceError {
        #[error("503 service unavailable")]
        Unavailable,
        #[error("404 workspace not found")]
        NotFound,
    }

    fn classify(error: &ServiceError) -> ErrorClass {
        match error {
            ServiceError::Unavailable => ErrorClass::Transient,
            ServiceError::NotFound => ErrorClass::Fatal,
        }
    }

    type StatusResult = Result<JobStatus<String>, ServiceError>;

    /// Status endpoint returning scripted responses; the last one repeats forever.
    struct MockJob {
        responses: Arc<Mutex<VecDeque<StatusResult>>>,
        seen_handles: Arc<Mutex<Vec<JobHandle>>>,
    }

    impl MockJob {
        fn new(responses: Vec<StatusResult>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                seen_handles: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn check(&self, handle: JobHandle) -> Ready<StatusResult> {
            self.seen_handles.lock().unwrap().push(handle);
            let mut responses = self.responses.lock().unwrap();
            let response = if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            };
            ready(response)
        }

        fn checks(&self) -> usize {
            self.seen_handles.lock().unwrap().len()
        }
    }

    #[derive(Default)]
    struct MockSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl MockSleeper {
        fn count(&self) -> usize {
            self.sleeps.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sleeper for MockSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    struct CancelOnSleep {
        token: CancellationToken,
    }

    #[async_trait]
    impl Sleeper for CancelOnSleep {
        async fn sleep(&self, _duration: Duration) {
            self.token.cancel();
            std::future::pending::<()>().await;
        }
    }

    const POLL: RetryPolicy = RetryPolicy::fixed(5, Duration::from_secs(10));
    const STATUS_RETRY: RetryPolicy = RetryPolicy::fixed(3, Duration::from_millis(1));

    fn poller() -> (JobPoller, Arc<MockSleeper>) {
        let sleeper = Arc::new(MockSleeper::default());
        let poller = JobPoller::new(RetryExecutor::with_sleeper(sleeper.clone()))
            .with_submit_retry(RetryPolicy::fixed(3, Duration::from_millis(1)))
            .with_status_retry(STATUS_RETRY);
        (poller, sleeper)
    }

    fn succeeded(value: &str) -> StatusResult {
        Ok(JobStatus::Succeeded(value.to_string()))
    }

    // =========================================================================
    // Polling sequences
    // =========================================================================

    #[tokio::test]
    async fn test_running_running_succeeded_completes_after_three_checks() {
        let (poller, sleeper) = poller();
        let job = MockJob::new(vec![
            Ok(JobStatus::Running),
            Ok(JobStatus::Running),
            succeeded("ws-1"),
        ]);

        let outcome = poller
            .await_job(&classify, JobHandle::new("job-1"), |h| job.check(h), &POLL)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Completed("ws-1".to_string()));
        assert_eq!(job.checks(), 3);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(10); 2]
        );
    }

    #[tokio::test]
    async fn test_never_leaving_running_times_out_without_error() {
        let (poller, sleeper) = poller();
        let job = MockJob::new(vec![Ok(JobStatus::Running)]);

        let outcome = poller
            .await_job(&classify, JobHandle::new("job-2"), |h| job.check(h), &POLL)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                handle: JobHandle::new("job-2"),
                checks: 5
            }
        );
        assert_eq!(job.checks(), 5);
        // No sleep after the final check.
        assert_eq!(sleeper.count(), 4);
    }

    #[tokio::test]
    async fn test_running_then_failed_is_remote_failure_after_two_checks() {
        let (poller, _) = poller();
        let failure = JobFailure::new("Bucket deletion failed").with_status_code(409);
        let job = MockJob::new(vec![
            Ok(JobStatus::Running),
            Ok(JobStatus::Failed(failure.clone())),
        ]);

        let outcome = poller
            .await_job(&classify, JobHandle::new("job-3"), |h| job.check(h), &POLL)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::RemoteFailure(failure));
        assert_eq!(job.checks(), 2);
    }

    #[tokio::test]
    async fn test_single_check_policy_never_sleeps() {
        let (poller, sleeper) = poller();
        let job = MockJob::new(vec![Ok(JobStatus::Running)]);

        let outcome = poller
            .await_job(
                &classify,
                JobHandle::new("job-4"),
                |h| job.check(h),
                &RetryPolicy::once(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, PollOutcome::TimedOut { checks: 1, .. }));
        assert_eq!(sleeper.count(), 0);
    }

    // =========================================================================
    // Per-check retries
    // =========================================================================

    #[tokio::test]
    async fn test_transient_status_check_is_retried_within_one_poll_step() {
        let (poller, sleeper) = poller();
        let job = MockJob::new(vec![
            Ok(JobStatus::Running),
            Err(ServiceError::Unavailable),
            succeeded("done"),
        ]);

        let outcome = poller
            .await_job(&classify, JobHandle::new("job-5"), |h| job.check(h), &POLL)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Completed("done".to_string()));
        assert_eq!(job.checks(), 3);
        // One poll interval, then one retry interval inside the second check.
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![POLL.interval(), STATUS_RETRY.interval()]
        );
    }

    #[tokio::test]
    async fn test_status_check_that_keeps_failing_is_an_error() {
        let (poller, _) = poller();
        let job = MockJob::new(vec![Err(ServiceError::Unavailable)]);

        let result = poller
            .await_job(&classify, JobHandle::new("job-6"), |h| job.check(h), &POLL)
            .await;

        match result {
            Err(JobError::Status { handle, source }) => {
                assert_eq!(handle.as_str(), "job-6");
                assert!(source.is_exhausted());
                assert_eq!(source.attempts(), STATUS_RETRY.max_attempts());
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert_eq!(job.checks(), STATUS_RETRY.max_attempts() as usize);
    }

    #[tokio::test]
    async fn test_fatal_status_check_fails_immediately() {
        let (poller, _) = poller();
        let job = MockJob::new(vec![Err(ServiceError::NotFound)]);

        let result = poller
            .await_job(&classify, JobHandle::new("job-7"), |h| job.check(h), &POLL)
            .await;

        assert!(matches!(
            result,
            Err(JobError::Status {
                source: RetryError::Fatal { attempts: 1, .. },
                ..
            })
        ));
        assert_eq!(job.checks(), 1);
    }

    // =========================================================================
    // Submission
    // =========================================================================

    #[tokio::test]
    async fn test_submit_is_retried_then_polled_with_its_handle() {
        let (poller, _) = poller();
        let submits = Arc::new(Mutex::new(0));
        let job = MockJob::new(vec![Ok(JobStatus::Running), succeeded("context")]);

        let outcome = poller
            .submit_and_await(
                &classify,
                || {
                    let mut count = submits.lock().unwrap();
                    *count += 1;
                    if *count == 1 {
                        ready(Err(ServiceError::Unavailable))
                    } else {
                        ready(Ok(JobSubmission::running("ctx-42")))
                    }
                },
                |h| job.check(h),
                &POLL,
            )
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Completed("context".to_string()));
        assert_eq!(*submits.lock().unwrap(), 2);
        assert!(job
            .seen_handles
            .lock()
            .unwrap()
            .iter()
            .all(|h| h.as_str() == "ctx-42"));
    }

    #[tokio::test]
    async fn test_terminal_submission_skips_status_checks() {
        let (poller, sleeper) = poller();
        let job = MockJob::new(vec![Ok(JobStatus::Running)]);

        let outcome = poller
            .submit_and_await(
                &classify,
                || {
                    ready(Ok(JobSubmission {
                        handle: JobHandle::new("fast"),
                        status: JobStatus::Succeeded("instant".to_string()),
                    }))
                },
                |h| job.check(h),
                &POLL,
            )
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Completed("instant".to_string()));
        assert_eq!(job.checks(), 0);
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_failed_submit_is_reported_as_submit_error() {
        let (poller, _) = poller();
        let job = MockJob::new(vec![Ok(JobStatus::Running)]);

        let result = poller
            .submit_and_await(
                &classify,
                || ready(Err::<JobSubmission<String>, _>(ServiceError::NotFound)),
                |h| job.check(h),
                &POLL,
            )
            .await;

        assert!(matches!(
            result,
            Err(JobError::Submit(RetryError::Fatal { .. }))
        ));
        assert_eq!(job.checks(), 0);
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[tokio::test]
    async fn test_cancellation_during_poll_sleep() {
        let token = CancellationToken::new();
        let executor = RetryExecutor::with_sleeper(Arc::new(CancelOnSleep {
            token: token.clone(),
        }))
        .with_cancellation(token);
        let poller = JobPoller::new(executor);
        let job = MockJob::new(vec![Ok(JobStatus::Running)]);

        let result = poller
            .await_job(&classify, JobHandle::new("job-8"), |h| job.check(h), &POLL)
            .await;

        let error = result.unwrap_err();
        assert!(error.is_cancelled());
        assert!(matches!(error, JobError::Cancelled { checks: 1, .. }));
        assert_eq!(job.checks(), 1);
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let (poller, sleeper) = poller();
        let job = MockJob::new(vec![
            Ok(JobStatus::Running),
            succeeded("ws-9"),
            Ok(JobStatus::Running),
            Ok(JobStatus::Failed(JobFailure::new("late failure"))),
        ]);

        let outcome = poller
            .await_job(&classify, JobHandle::new("job-9"), |h| job.check(h), &POLL)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Completed("ws-9".to_string()));
        assert_eq!(job.checks(), 2);
        assert_eq!(sleeper.count(), 1);
    }
}
