//! Wire types for the identity service and the workspace manager.
//!
//! Only the fields the CLI reads or sends are modeled; unknown fields are ignored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terra_core::{JobFailure, JobHandle, JobStatus};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Shared
// ─────────────────────────────────────────────────────────────────────────────

/// Error body returned by both services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub causes: Vec<String>,
}

impl From<ErrorReport> for JobFailure {
    fn from(report: ErrorReport) -> Self {
        JobFailure {
            message: report.message,
            status_code: report.status_code,
            causes: report.causes,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity service (SAM)
// ─────────────────────────────────────────────────────────────────────────────

/// GET /register/user/v2/self/info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusInfo {
    pub user_subject_id: String,
    pub user_email: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_subject_id: String,
    pub user_email: String,
}

/// POST /register/user/v2/self
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub user_info: UserInfo,
}

/// POST /api/users/v1/invite/{email}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusDetails {
    pub user_subject_id: String,
    pub user_email: String,
}

/// Policy a group member is added under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    Member,
    Admin,
}

impl GroupPolicy {
    pub fn sam_policy(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for GroupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown group policy '{}' (expected member|admin)", other)),
        }
    }
}

impl fmt::Display for GroupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sam_policy())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace manager (WSM)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobReportStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub id: String,
    pub status: JobReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
}

/// Caller-chosen job id sent with asynchronous requests, so a replayed submit refers to
/// the same job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobControl {
    pub id: String,
}

impl JobControl {
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }
}

/// Result body of every asynchronous workspace manager endpoint (submit and poll).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_report: JobReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_report: Option<ErrorReport>,
}

impl JobResult {
    pub fn handle(&self) -> JobHandle {
        JobHandle::new(self.job_report.id.clone())
    }

    /// Maps the job report onto the poller's status. A failed job without an error
    /// report still carries the job's status code.
    pub fn into_status(self) -> JobStatus<()> {
        match self.job_report.status {
            JobReportStatus::Running => JobStatus::Running,
            JobReportStatus::Succeeded => JobStatus::Succeeded(()),
            JobReportStatus::Failed => {
                let failure = match self.error_report {
                    Some(report) => JobFailure::from(report),
                    None => JobFailure {
                        message: format!("job {} failed", self.job_report.id),
                        status_code: self.job_report.status_code,
                        causes: Vec::new(),
                    },
                };
                JobStatus::Failed(failure)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    pub id: Uuid,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spend_profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWorkspace {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpContext {
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDescription {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_facing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_context: Option<GcpContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCloudContextRequest {
    pub cloud_platform: String,
    pub job_control: JobControl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRoleRequest {
    pub member_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteControlledBucketRequest {
    pub job_control: JobControl,
}

/// Workspace role granted to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IamRole {
    Reader,
    Writer,
    Owner,
}

impl IamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reader => "READER",
            Self::Writer => "WRITER",
            Self::Owner => "OWNER",
        }
    }
}

impl FromStr for IamRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READER" => Ok(Self::Reader),
            "WRITER" => Ok(Self::Writer),
            "OWNER" => Ok(Self::Owner),
            other => Err(format!(
                "unknown workspace role '{}' (expected reader|writer|owner)",
                other
            )),
        }
    }
}

impl fmt::Display for IamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_result_status_mapping() {
        let running: JobResult = serde_json::from_str(
            r#"{"jobReport":{"id":"j1","status":"RUNNING","statusCode":202}}"#,
        )
        .unwrap();
        assert_eq!(running.handle().as_str(), "j1");
        assert_eq!(running.into_status(), JobStatus::Running);

        let failed: JobResult = serde_json::from_str(
            r#"{
                "jobReport":{"id":"j2","status":"FAILED","statusCode":403,"completed":"2024-03-01T10:15:00Z"},
                "errorReport":{"message":"User is not authorized to link spend profile","statusCode":403,"causes":["denied"]}
            }"#,
        )
        .unwrap();
        assert!(failed.job_report.completed.is_some());
        match failed.into_status() {
            JobStatus::Failed(failure) => {
                assert_eq!(failure.status_code, Some(403));
                assert!(failure.message.contains("spend profile"));
                assert_eq!(failure.causes, vec!["denied".to_string()]);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_job_without_error_report() {
        let failed: JobResult =
            serde_json::from_str(r#"{"jobReport":{"id":"j3","status":"FAILED","statusCode":500}}"#)
                .unwrap();
        assert_eq!(
            failed.into_status(),
            JobStatus::Failed(JobFailure {
                message: "job j3 failed".to_string(),
                status_code: Some(500),
                causes: Vec::new(),
            })
        );
    }

    #[test]
    fn test_role_and_policy_parsing() {
        assert_eq!("writer".parse::<IamRole>().unwrap(), IamRole::Writer);
        assert!("viewer".parse::<IamRole>().is_err());
        assert_eq!("ADMIN".parse::<GroupPolicy>().unwrap(), GroupPolicy::Admin);
        assert_eq!(GroupPolicy::Member.to_string(), "member");
    }
}
