//! Workspace manager (WSM) client.
//!
//! Creating a cloud context and deleting a controlled bucket are asynchronous on the
//! server: the request carries a caller-generated job id and the result endpoint is
//! polled through the [`JobPoller`].

use log::{debug, error, info};
use serde::Serialize;
use terra_core::retry::policy::{BOOTSTRAP_POLL, DEFAULT_RETRY, RESOURCE_POLL};
use terra_core::{JobPoller, JobStatus, JobSubmission, PollOutcome, RetryExecutor};
use uuid::Uuid;

use crate::classifiers;
use crate::client::{segment, ServiceClient};
use crate::error::{ApiError, Error, Result};
use crate::sam::SamService;
use crate::types::{
    CreateCloudContextRequest, CreateWorkspaceRequest, CreatedWorkspace,
    DeleteControlledBucketRequest, GrantRoleRequest, IamRole, JobControl, JobResult,
    WorkspaceDescription,
};

const WORKSPACES_PATH: &str = "/api/workspaces/v1";

const WORKSPACE_STAGE: &str = "MC_WORKSPACE";
const CLOUD_PLATFORM: &str = "GCP";

/// Marker in a failed cloud context job when the user may not bill to the spend profile.
const SPEND_PROFILE_MARKER: &str = "spend profile";
const FORBIDDEN: u16 = 403;

#[derive(Debug, Clone)]
pub struct WsmService {
    client: ServiceClient,
    executor: RetryExecutor,
    poller: JobPoller,
    sam: SamService,
    spend_profile: Option<String>,
}

impl WsmService {
    /// `sam` is used to invite users who are granted a role before they have an account.
    pub fn new(client: ServiceClient, executor: RetryExecutor, sam: SamService) -> Self {
        Self {
            client,
            poller: JobPoller::new(executor.clone()),
            executor,
            sam,
            spend_profile: None,
        }
    }

    pub fn with_spend_profile(mut self, spend_profile: Option<String>) -> Self {
        self.spend_profile = spend_profile;
        self
    }

    /// Creates a workspace and the Google project backing it.
    ///
    /// If the cloud context job fails the half-created workspace is deleted. A failure
    /// caused by missing spend profile access is reported as user-actionable.
    pub async fn create_workspace(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<WorkspaceDescription> {
        const CONTEXT: &str = "Error creating a new workspace";

        let workspace_id = Uuid::new_v4();
        let request = CreateWorkspaceRequest {
            id: workspace_id,
            stage: WORKSPACE_STAGE.to_string(),
            display_name: Some(name.to_string()),
            description: description.map(str::to_string),
            spend_profile: self.spend_profile.clone(),
        };
        let created: CreatedWorkspace = self
            .executor
            .execute(&DEFAULT_RETRY, &classifiers::wsm(), || {
                self.client.post(WORKSPACES_PATH, &request)
            })
            .await
            .map_err(|e| Error::remote(CONTEXT, e))?;
        info!("Created workspace {}", created.id);

        let context_request = CreateCloudContextRequest {
            cloud_platform: CLOUD_PLATFORM.to_string(),
            job_control: JobControl::generate(),
        };
        let submit_path = format!("{}/{}/cloudcontexts", WORKSPACES_PATH, workspace_id);
        let outcome = self
            .poller
            .submit_and_await(
                &classifiers::wsm(),
                || self.submit_job(&submit_path, &context_request),
                |handle| {
                    self.job_status(format!(
                        "{}/{}/cloudcontexts/result/{}",
                        WORKSPACES_PATH,
                        workspace_id,
                        segment(handle.as_str())
                    ))
                },
                &BOOTSTRAP_POLL,
            )
            .await
            .map_err(|e| Error::job(CONTEXT, e))?;
        debug!("Create workspace context outcome: {:?}", outcome);

        match outcome {
            PollOutcome::Completed(()) => self.get_workspace(workspace_id).await,
            PollOutcome::RemoteFailure(failure) => {
                let cleaned_up = match self.delete_workspace(workspace_id).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            "Failed to delete workspace {} when cleaning up failed creation of cloud context: {}",
                            workspace_id, e
                        );
                        false
                    }
                };

                if failure.status_code == Some(FORBIDDEN)
                    && failure.message.contains(SPEND_PROFILE_MARKER)
                {
                    let mut message = String::from(
                        "Accessing the spend profile failed. Ask an administrator to grant you access.",
                    );
                    if !cleaned_up {
                        message.push_str(&format!(
                            " There was a problem cleaning up the partially created workspace ID {}",
                            workspace_id
                        ));
                    }
                    return Err(Error::user_actionable(message));
                }
                Err(Error::JobFailed {
                    context: CONTEXT.to_string(),
                    failure,
                })
            }
            PollOutcome::TimedOut { handle, .. } => Err(Error::StillRunning {
                context: CONTEXT.to_string(),
                handle,
            }),
        }
    }

    /// GET /api/workspaces/v1/{id}
    pub async fn get_workspace(&self, workspace_id: Uuid) -> Result<WorkspaceDescription> {
        let path = format!("{}/{}", WORKSPACES_PATH, workspace_id);
        self.executor
            .execute(&DEFAULT_RETRY, &classifiers::wsm(), || self.client.get(&path))
            .await
            .map_err(|e| Error::remote("Error fetching workspace", e))
    }

    /// DELETE /api/workspaces/v1/{id}
    pub async fn delete_workspace(&self, workspace_id: Uuid) -> Result<()> {
        let path = format!("{}/{}", WORKSPACES_PATH, workspace_id);
        self.executor
            .execute(&DEFAULT_RETRY, &classifiers::wsm(), || {
                self.client.delete(&path)
            })
            .await
            .map_err(|e| Error::remote("Error deleting workspace", e))
    }

    /// POST /api/workspaces/v1/{id}/roles/{role}/members
    ///
    /// An email the identity service does not know yet is invited and the grant is
    /// replayed, unless invitations require an administrator.
    pub async fn grant_role(&self, workspace_id: Uuid, email: &str, role: IamRole) -> Result<()> {
        let path = format!(
            "{}/{}/roles/{}/members",
            WORKSPACES_PATH,
            workspace_id,
            role.as_str()
        );
        let body = GrantRoleRequest {
            member_email: email.to_string(),
        };
        let grant = || self.client.post_no_content(&path, &body);

        let result = if self.sam.invite_requires_admin() {
            self.executor
                .execute(&DEFAULT_RETRY, &classifiers::wsm(), grant)
                .await
        } else {
            let classifier = classifiers::add_member();
            self.executor
                .execute_with_recovery(
                    &DEFAULT_RETRY,
                    &classifier,
                    |e: &ApiError| classifier.is_precondition(e),
                    || self.sam.invite_as_recovery(email),
                    grant,
                )
                .await
        };
        result.map_err(|e| Error::remote("Error granting IAM role on workspace", e))
    }

    /// POST /api/workspaces/v1/{id}/resources/controlled/gcp/buckets/{resourceId}
    pub async fn delete_controlled_bucket(
        &self,
        workspace_id: Uuid,
        resource_id: Uuid,
    ) -> Result<()> {
        const CONTEXT: &str = "Error deleting controlled GCS bucket in the workspace";

        let buckets_path = format!(
            "{}/{}/resources/controlled/gcp/buckets",
            WORKSPACES_PATH, workspace_id
        );
        let submit_path = format!("{}/{}", buckets_path, resource_id);
        let request = DeleteControlledBucketRequest {
            job_control: JobControl::generate(),
        };

        let outcome = self
            .poller
            .submit_and_await(
                &classifiers::wsm(),
                || self.submit_job(&submit_path, &request),
                |handle| {
                    self.job_status(format!(
                        "{}/delete-result/{}",
                        buckets_path,
                        segment(handle.as_str())
                    ))
                },
                &RESOURCE_POLL,
            )
            .await
            .map_err(|e| Error::job(CONTEXT, e))?;
        debug!("Delete controlled bucket outcome: {:?}", outcome);

        job_result(CONTEXT, outcome)
    }

    async fn submit_job<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<JobSubmission<()>, ApiError> {
        let result: JobResult = self.client.post(path, body).await?;
        Ok(JobSubmission {
            handle: result.handle(),
            status: result.into_status(),
        })
    }

    async fn job_status(&self, path: String) -> std::result::Result<JobStatus<()>, ApiError> {
        let result: JobResult = self.client.get(&path).await?;
        Ok(result.into_status())
    }
}

/// Maps a poll outcome onto the service result. A job still running when the budget
/// ran out is reported as unresolved, never as failed.
fn job_result<T>(context: &str, outcome: PollOutcome<T>) -> Result<T> {
    match outcome {
        PollOutcome::Completed(value) => Ok(value),
        PollOutcome::RemoteFailure(failure) => Err(Error::JobFailed {
            context: context.to_string(),
            failure,
        }),
        PollOutcome::TimedOut { handle, .. } => Err(Error::StillRunning {
            context: context.to_string(),
            handle,
        }),
    }
}
