//! Classifier presets for each call site.
//!
//! Every preset retries timeouts and 500/502/503/504. The differences are which other
//! statuses a given call treats as transient or as a missing precondition.

use terra_core::HttpClassifier;

/// Status returned when adding an email the identity service has never seen.
pub const UNKNOWN_MEMBER_STATUS: u16 = 400;

/// Status returned when looking up a user who has not registered.
pub const UNREGISTERED_USER_STATUS: u16 = 404;

/// Plain identity service calls.
pub const fn sam() -> HttpClassifier {
    HttpClassifier::new()
}

/// Plain workspace manager calls.
pub const fn wsm() -> HttpClassifier {
    HttpClassifier::new()
}

/// Preset for storage clients (bucket and object reads) called right after a
/// permission grant. The grant can take a while to propagate, so 403 is retried as
/// well. None of the identity or workspace manager calls use it.
pub const fn storage() -> HttpClassifier {
    HttpClassifier::new().treat_forbidden_as_transient()
}

/// Adding a member to a group or granting a workspace role: a 400 means the email is
/// not known yet and an invitation fixes it.
pub const fn add_member() -> HttpClassifier {
    HttpClassifier::new().precondition_on(UNKNOWN_MEMBER_STATUS)
}

/// Looking up the current user: a 404 means they have never registered.
pub const fn register_bootstrap() -> HttpClassifier {
    HttpClassifier::new().precondition_on(UNREGISTERED_USER_STATUS)
}

#[cfg(test)]
mod tests {
    use terra_core::{Classify, ErrorClass};

    use super::*;
    use crate::error::ApiError;

    fn status(code: u16) -> ApiError {
        ApiError::api(code, "error")
    }

    #[test]
    fn test_server_errors_are_transient_everywhere() {
        for classifier in [sam(), wsm(), storage(), add_member(), register_bootstrap()] {
            for code in [500, 502, 503, 504] {
                assert_eq!(classifier.classify(&status(code)), ErrorClass::Transient);
            }
            assert_eq!(classifier.classify(&status(409)), ErrorClass::Fatal);
        }
    }

    #[test]
    fn test_forbidden_only_transient_for_storage() {
        assert_eq!(storage().classify(&status(403)), ErrorClass::Transient);
        assert_eq!(sam().classify(&status(403)), ErrorClass::Fatal);
        assert_eq!(wsm().classify(&status(403)), ErrorClass::Fatal);
    }

    #[test]
    fn test_preconditions_only_at_declared_call_sites() {
        assert_eq!(add_member().classify(&status(400)), ErrorClass::Precondition);
        assert_eq!(sam().classify(&status(400)), ErrorClass::Fatal);
        assert_eq!(
            register_bootstrap().classify(&status(404)),
            ErrorClass::Precondition
        );
        assert_eq!(add_member().classify(&status(404)), ErrorClass::Fatal);
        assert_eq!(wsm().classify(&status(404)), ErrorClass::Fatal);
    }

    #[test]
    fn test_non_http_failures_are_fatal() {
        let stale = ApiError::Credentials(terra_core::CredentialError::Stale);
        assert_eq!(sam().classify(&stale), ErrorClass::Fatal);
        assert_eq!(wsm().classify(&status(401)), ErrorClass::Fatal);
    }
}
