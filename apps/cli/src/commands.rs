use clap::{Parser, Subcommand};
use serde::Serialize;
use terra_services::{GroupPolicy, IamRole, Result};
use uuid::Uuid;

use crate::main_lib::Services;

#[derive(Parser, Debug)]
#[command(name = "terra")]
#[command(about = "Command-line client for Terra workspaces, groups and users", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Users of the identity service
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Group membership
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },

    /// Workspaces
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommand,
    },

    /// Controlled resources in a workspace
    Resource {
        #[command(subcommand)]
        command: ResourceCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Show the current user, registering them on first use
    Status,

    /// Invite a user who has no account yet
    Invite {
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Add a user to a group, inviting them if needed
    AddUser {
        #[arg(long)]
        group: String,

        /// member or admin
        #[arg(long, default_value = "member")]
        policy: GroupPolicy,

        #[arg(long)]
        email: String,
    },

    /// Remove a user from a group
    RemoveUser {
        #[arg(long)]
        group: String,

        /// member or admin
        #[arg(long, default_value = "member")]
        policy: GroupPolicy,

        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommand {
    /// Create a workspace and its Google project
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a workspace
    Delete {
        #[arg(long)]
        id: Uuid,
    },

    /// Grant a user a role on a workspace, inviting them if needed
    AddUser {
        #[arg(long)]
        id: Uuid,

        #[arg(long)]
        email: String,

        /// reader, writer or owner
        #[arg(long)]
        role: IamRole,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommand {
    /// Delete a controlled GCS bucket
    DeleteBucket {
        #[arg(long)]
        workspace: Uuid,

        #[arg(long)]
        resource: Uuid,
    },
}

/// Runs one command and returns what to print on success.
pub async fn run(command: Command, services: &Services) -> Result<String> {
    match command {
        Command::User { command } => match command {
            UserCommand::Status => {
                let info = services.sam.get_user_info_or_register_user().await?;
                Ok(to_json(&info))
            }
            UserCommand::Invite { email } => {
                let details = services.sam.invite_user(&email).await?;
                Ok(to_json(&details))
            }
        },
        Command::Group { command } => match command {
            GroupCommand::AddUser {
                group,
                policy,
                email,
            } => {
                services
                    .sam
                    .add_user_to_group(&group, policy, &email)
                    .await?;
                Ok(format!("User {} added to group {} as {}.", email, group, policy))
            }
            GroupCommand::RemoveUser {
                group,
                policy,
                email,
            } => {
                services
                    .sam
                    .remove_user_from_group(&group, policy, &email)
                    .await?;
                Ok(format!("User {} removed from group {} ({}).", email, group, policy))
            }
        },
        Command::Workspace { command } => match command {
            WorkspaceCommand::Create { name, description } => {
                let workspace = services
                    .wsm
                    .create_workspace(&name, description.as_deref())
                    .await?;
                Ok(to_json(&workspace))
            }
            WorkspaceCommand::Delete { id } => {
                services.wsm.delete_workspace(id).await?;
                Ok(format!("Workspace {} deleted.", id))
            }
            WorkspaceCommand::AddUser { id, email, role } => {
                services.wsm.grant_role(id, &email, role).await?;
                Ok(format!("User {} granted {} on workspace {}.", email, role, id))
            }
        },
        Command::Resource { command } => match command {
            ResourceCommand::DeleteBucket {
                workspace,
                resource,
            } => {
                services
                    .wsm
                    .delete_controlled_bucket(workspace, resource)
                    .await?;
                Ok(format!("Bucket {} deleted.", resource))
            }
        },
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("<unprintable response: {}>", e))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_group_add_user() {
        let cli = Cli::try_parse_from([
            "terra",
            "group",
            "add-user",
            "--group",
            "analysts",
            "--policy",
            "admin",
            "--email",
            "jane@example.com",
        ])
        .unwrap();
        match cli.command {
            Command::Group {
                command: GroupCommand::AddUser { policy, .. },
            } => assert_eq!(policy, GroupPolicy::Admin),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        let result = Cli::try_parse_from([
            "terra",
            "workspace",
            "add-user",
            "--id",
            "6f1c2e0a-3b7d-4c1e-9a51-0d2b8f7e4c3a",
            "--email",
            "jane@example.com",
            "--role",
            "viewer",
        ]);
        assert!(result.is_err());
    }
}
