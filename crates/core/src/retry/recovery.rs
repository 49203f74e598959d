//! One-time recovery from a missing precondition.
//!
//! Example: adding a user to a group fails because the service has never heard of the
//! email. Invite the user (once), then add them again. The corrective action is never
//! repeated, so a broken recovery cannot turn into a loop of duplicate invitations.

use std::error::Error as StdError;
use std::future::Future;

use log::{info, warn};

use super::classifier::{Classify, ErrorClass};
use super::executor::RetryExecutor;
use super::policy::RetryPolicy;
use crate::errors::RetryError;

/// The caller's classifier with the precondition error overridden. Before the recovery
/// it is reported as `Precondition`, which the executor does not retry. After the
/// recovery it may still show up for a few seconds while the fix propagates between
/// services, so it counts as transient.
struct RecoveryClassifier<'a, C: ?Sized, P> {
    inner: &'a C,
    is_precondition: &'a P,
    recovered: bool,
}

impl<E, C, P> Classify<E> for RecoveryClassifier<'_, C, P>
where
    C: Classify<E> + ?Sized,
    P: Fn(&E) -> bool,
{
    fn classify(&self, error: &E) -> ErrorClass {
        if !(self.is_precondition)(error) {
            self.inner.classify(error)
        } else if self.recovered {
            ErrorClass::Transient
        } else {
            ErrorClass::Precondition
        }
    }
}

impl RetryExecutor {
    /// Runs `operation` under `policy`; the first time it fails with a precondition
    /// error, runs `recover` exactly once and replays `operation` under a fresh `policy`
    /// budget.
    ///
    /// - Before the recovery, failures are classified by `classifier`: transient ones
    ///   are retried, fatal ones end the call. A precondition error stops the retries
    ///   and triggers the recovery, whichever attempt it shows up on.
    /// - If `recover` fails the call ends with [`RetryError::RecoveryFailed`] and
    ///   `operation` is not invoked again.
    /// - During the replay the precondition error counts as transient and `recover` is
    ///   never run a second time.
    ///
    /// Reported attempt counts include the invocations made before the recovery.
    pub async fn execute_with_recovery<T, E, F, Fut, C, P, R, RFut>(
        &self,
        policy: &RetryPolicy,
        classifier: &C,
        is_precondition: P,
        recover: R,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Classify<E> + ?Sized,
        P: Fn(&E) -> bool,
        R: FnOnce() -> RFut,
        RFut: Future<Output = Result<(), E>>,
        E: StdError + 'static,
    {
        let before_recovery = RecoveryClassifier {
            inner: classifier,
            is_precondition: &is_precondition,
            recovered: false,
        };
        let (attempts, precondition_error) =
            match self.execute(policy, &before_recovery, &mut operation).await {
                Ok(value) => return Ok(value),
                Err(RetryError::Fatal { attempts, source }) if is_precondition(&source) => {
                    (attempts, source)
                }
                Err(error) => return Err(error),
            };

        info!(
            "Caught possible one-time error on attempt {}: {}",
            attempts, precondition_error
        );
        if let Err(recover_error) = recover().await {
            warn!("One-time recovery action failed: {}", recover_error);
            return Err(RetryError::RecoveryFailed {
                attempts,
                source: recover_error,
            });
        }

        let after_recovery = RecoveryClassifier {
            inner: classifier,
            is_precondition: &is_precondition,
            recovered: true,
        };
        self.execute(policy, &after_recovery, operation)
            .await
            .map_err(|error| error.with_prior_attempts(attempts))
    }
}
