//! Identity service (SAM) client: registration, invitations and group membership.

use log::info;
use terra_core::retry::policy::DEFAULT_RETRY;
use terra_core::{RetryError, RetryExecutor};

use crate::classifiers;
use crate::client::{segment, ServiceClient};
use crate::error::{ApiError, Error, Result};
use crate::types::{GroupPolicy, UserStatus, UserStatusDetails, UserStatusInfo};

const SELF_INFO_PATH: &str = "/register/user/v2/self/info";
const SELF_REGISTER_PATH: &str = "/register/user/v2/self";

/// Marker in a 400 response for users who may not use the platform until invited.
const INVITE_REQUIRED_MARKER: &str = "request an invite from an admin";

#[derive(Debug, Clone)]
pub struct SamService {
    client: ServiceClient,
    executor: RetryExecutor,
    invite_requires_admin: bool,
}

impl SamService {
    pub fn new(client: ServiceClient, executor: RetryExecutor) -> Self {
        Self {
            client,
            executor,
            invite_requires_admin: false,
        }
    }

    /// On deployments where only administrators may invite users, an unknown email is
    /// reported to the caller instead of being invited automatically.
    pub fn with_invite_requires_admin(mut self, invite_requires_admin: bool) -> Self {
        self.invite_requires_admin = invite_requires_admin;
        self
    }

    pub fn invite_requires_admin(&self) -> bool {
        self.invite_requires_admin
    }

    /// GET /register/user/v2/self/info
    pub async fn get_user_info_for_self(&self) -> Result<UserStatusInfo> {
        self.executor
            .execute(&DEFAULT_RETRY, &classifiers::sam(), || {
                self.client.get(SELF_INFO_PATH)
            })
            .await
            .map_err(|e| {
                handle_client_errors("Error reading user information for current user", e)
            })
    }

    /// Looks up the current user, registering them first if the service has never
    /// seen them.
    pub async fn get_user_info_or_register_user(&self) -> Result<UserStatusInfo> {
        let classifier = classifiers::register_bootstrap();
        self.executor
            .execute_with_recovery(
                &DEFAULT_RETRY,
                &classifier,
                |e: &ApiError| classifier.is_precondition(e),
                || async {
                    self.register_user_attempts()
                        .await
                        .map(drop)
                        .map_err(recovery_cause)
                },
                || self.client.get(SELF_INFO_PATH),
            )
            .await
            .map_err(|e| handle_client_errors("Error reading user information", e))
    }

    /// POST /register/user/v2/self
    ///
    /// Registers the logged-in user. Not the same as inviting a user.
    pub async fn register_user(&self) -> Result<UserStatus> {
        self.register_user_attempts()
            .await
            .map_err(|e| handle_client_errors("Error registering new user", e))
    }

    /// POST /api/users/v1/invite/{email}
    pub async fn invite_user(&self, email: &str) -> Result<UserStatusDetails> {
        self.invite_user_attempts(email)
            .await
            .map_err(|e| handle_client_errors("Error inviting new user", e))
    }

    /// PUT /api/groups/v1/{group}/{policy}/{email}
    ///
    /// An email the service does not know yet is invited and the add is replayed,
    /// unless invitations require an administrator.
    pub async fn add_user_to_group(
        &self,
        group: &str,
        policy: GroupPolicy,
        email: &str,
    ) -> Result<()> {
        let path = group_member_path(group, policy, email);
        let add = || self.client.put_no_content(&path);

        let result = if self.invite_requires_admin {
            self.executor
                .execute(&DEFAULT_RETRY, &classifiers::sam(), add)
                .await
        } else {
            let classifier = classifiers::add_member();
            self.executor
                .execute_with_recovery(
                    &DEFAULT_RETRY,
                    &classifier,
                    |e: &ApiError| classifier.is_precondition(e),
                    || self.invite_as_recovery(email),
                    add,
                )
                .await
        };
        result.map_err(|e| handle_client_errors("Error adding user to group", e))
    }

    /// DELETE /api/groups/v1/{group}/{policy}/{email}
    pub async fn remove_user_from_group(
        &self,
        group: &str,
        policy: GroupPolicy,
        email: &str,
    ) -> Result<()> {
        let path = group_member_path(group, policy, email);
        self.executor
            .execute(&DEFAULT_RETRY, &classifiers::sam(), || {
                self.client.delete(&path)
            })
            .await
            .map_err(|e| handle_client_errors("Error removing user from group", e))
    }

    /// Invitation used as the one-time corrective action of another call.
    pub(crate) async fn invite_as_recovery(
        &self,
        email: &str,
    ) -> std::result::Result<(), ApiError> {
        info!("Inviting new user: {}", email);
        self.invite_user_attempts(email)
            .await
            .map(drop)
            .map_err(recovery_cause)
    }

    async fn invite_user_attempts(
        &self,
        email: &str,
    ) -> std::result::Result<UserStatusDetails, RetryError<ApiError>> {
        let path = format!("/api/users/v1/invite/{}", segment(email));
        let details: UserStatusDetails = self
            .executor
            .execute(&DEFAULT_RETRY, &classifiers::sam(), || {
                self.client.post_empty(&path)
            })
            .await?;
        info!("Invited new user: {}", details.user_email);
        Ok(details)
    }

    async fn register_user_attempts(
        &self,
    ) -> std::result::Result<UserStatus, RetryError<ApiError>> {
        let status: UserStatus = self
            .executor
            .execute(&DEFAULT_RETRY, &classifiers::sam(), || {
                self.client.post_empty(SELF_REGISTER_PATH)
            })
            .await?;
        info!(
            "User registered: {}, {}",
            status.user_info.user_subject_id, status.user_info.user_email
        );
        Ok(status)
    }
}

fn group_member_path(group: &str, policy: GroupPolicy, email: &str) -> String {
    format!(
        "/api/groups/v1/{}/{}/{}",
        segment(group),
        policy.sam_policy(),
        segment(email)
    )
}

/// Error handed back by a corrective action. A cancelled action stays cancelled even
/// if it had already seen a transient failure.
fn recovery_cause(error: RetryError<ApiError>) -> ApiError {
    if error.is_cancelled() {
        return ApiError::Cancelled;
    }
    error.into_cause().unwrap_or(ApiError::Cancelled)
}

/// Wraps a failed identity service call with the operation that was attempted. A user
/// who still needs an invitation gets an actionable message instead.
fn handle_client_errors(context: &str, error: RetryError<ApiError>) -> Error {
    if let Some(ApiError::Api { status: 400, message }) = error.cause() {
        if message.contains(INVITE_REQUIRED_MARKER) {
            return Error::user_actionable(
                "Fetching the user's registration information failed. Ask an administrator to invite you.",
            );
        }
    }
    Error::remote(context, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_member_path_encodes_segments() {
        assert_eq!(
            group_member_path("my group", GroupPolicy::Admin, "a+b@example.com"),
            "/api/groups/v1/my%20group/admin/a%2Bb%40example.com"
        );
    }

    #[test]
    fn test_invite_required_is_user_actionable() {
        let error = handle_client_errors(
            "Error reading user information",
            RetryError::Fatal {
                attempts: 1,
                source: ApiError::api(
                    400,
                    "User is not allowed: request an invite from an admin first",
                ),
            },
        );
        assert!(matches!(error, Error::UserActionable(_)));
        assert!(error.to_string().contains("Ask an administrator to invite you"));
    }

    #[test]
    fn test_cancelled_recovery_keeps_cancellation() {
        let cause = recovery_cause(RetryError::Cancelled {
            attempts: 1,
            last_error: Some(ApiError::api(503, "unavailable")),
        });
        assert!(matches!(cause, ApiError::Cancelled));

        let cause = recovery_cause(RetryError::Fatal {
            attempts: 1,
            source: ApiError::api(409, "already invited"),
        });
        assert!(matches!(cause, ApiError::Api { status: 409, .. }));
    }

    #[test]
    fn test_other_bad_requests_keep_context() {
        let error = handle_client_errors(
            "Error adding user to group",
            RetryError::Fatal {
                attempts: 1,
                source: ApiError::api(400, "malformed email"),
            },
        );
        assert!(matches!(error, Error::Remote { .. }));
        assert!(error.to_string().starts_with("Error adding user to group"));
    }
}
