//! The retry loop.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::classifier::{Classify, ErrorClass};
use super::policy::RetryPolicy;
use super::sleeper::{Sleeper, TokioSleeper};
use crate::errors::RetryError;

/// Runs remote operations with bounded, constant-interval retries.
///
/// The executor holds no per-call state: the same instance can run any number of calls
/// and each one gets the full budget of the policy it is given. Cloning is cheap and
/// clones share the sleeper and the cancellation token.
#[derive(Clone)]
pub struct RetryExecutor {
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self::with_sleeper(Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sleeper,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to abandon in-flight calls. Cancelling interrupts the wait between
    /// attempts; an attempt already on the wire runs to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Waits for `duration`. Returns `false` if cancelled first.
    pub(crate) async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.sleeper.sleep(duration) => true,
        }
    }

    /// Invokes `operation` until it succeeds, fails with a non-transient error, or the
    /// policy's attempts are used up.
    ///
    /// A `Precondition` classification is not retryable here and is returned as
    /// [`RetryError::Fatal`]; use
    /// [`execute_with_recovery`](Self::execute_with_recovery) for call sites that know
    /// how to fix the precondition.
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        policy: &RetryPolicy,
        classifier: &C,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Classify<E> + ?Sized,
        E: StdError + 'static,
    {
        let max_attempts = policy.max_attempts();
        let mut attempt: u32 = 1;
        let mut last_error: Option<E> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled {
                    attempts: attempt - 1,
                    last_error,
                });
            }

            debug!("Request attempt #{}", attempt);
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match classifier.classify(&error) {
                ErrorClass::Transient if attempt < max_attempts => {
                    info!(
                        "Caught retryable error on attempt {}/{}: {}",
                        attempt, max_attempts, error
                    );
                    last_error = Some(error);
                }
                ErrorClass::Transient => {
                    warn!(
                        "Request with retries timed out after {} attempts: {}",
                        attempt, error
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: error,
                    });
                }
                ErrorClass::Precondition | ErrorClass::Fatal => {
                    debug!("Non-retryable error on attempt {}: {}", attempt, error);
                    return Err(RetryError::Fatal {
                        attempts: attempt,
                        source: error,
                    });
                }
            }

            if !self.pause(policy.interval()).await {
                info!("Retry loop cancelled after {} attempts", attempt);
                return Err(RetryError::Cancelled {
                    attempts: attempt,
                    last_error,
                });
            }
            attempt += 1;
        }
    }
}
