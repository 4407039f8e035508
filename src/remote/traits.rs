//! RemoteApi trait definition
//!
//! Defines the abstract interface to the target workspace. Every call is
//! a single network round trip and is not retried here; the pipeline treats
//! any error as a failure of the one item that issued it.

use crate::model::*;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tag that already exists in the target workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingTag {
    #[serde(alias = "gid")]
    pub id: TargetId,
    pub name: String,
}

/// Abstract interface for all target workspace operations.
///
/// Implementations must be thread-safe (`Send + Sync`): a phase issues many
/// calls concurrently through a shared `Arc<dyn RemoteApi>`.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    // ========================================================================
    // Entity creation
    // ========================================================================

    async fn create_team(&self, req: &CreateTeamRequest) -> Result<TargetId>;

    async fn create_project(&self, req: &CreateProjectRequest) -> Result<TargetId>;

    async fn create_tag(&self, req: &CreateTagRequest) -> Result<TargetId>;

    async fn create_task(&self, req: &CreateTaskRequest) -> Result<TargetId>;

    async fn create_attachment(&self, req: &CreateAttachmentRequest) -> Result<TargetId>;

    /// Add a user to the workspace by contact address
    async fn create_user(&self, req: &CreateUserRequest) -> Result<TargetId>;

    /// Post a comment on a task
    async fn add_story(&self, task: &TargetId, text: &str) -> Result<()>;

    /// All tags already present in a workspace
    async fn existing_tags(&self, workspace: &TargetId) -> Result<Vec<ExistingTag>>;

    // ========================================================================
    // Relationships
    // ========================================================================

    async fn add_subtask(&self, parent: &TargetId, subtask: &TargetId) -> Result<()>;

    async fn add_task_to_project(&self, project: &TargetId, task: &TargetId) -> Result<()>;

    async fn add_tag_to_task(&self, tag: &TargetId, task: &TargetId) -> Result<()>;

    /// Assign a task. Clears any assignee status previously set on it.
    async fn set_assignee(&self, task: &TargetId, user: &TargetId) -> Result<()>;

    async fn set_assignee_status(&self, task: &TargetId, status: AssigneeStatus) -> Result<()>;

    async fn add_task_followers(&self, task: &TargetId, followers: &[TargetId]) -> Result<()>;

    async fn add_project_followers(
        &self,
        project: &TargetId,
        followers: &[TargetId],
    ) -> Result<()>;

    /// Teams only accept members one at a time
    async fn add_team_member(&self, team: &TargetId, user: &TargetId) -> Result<()>;

    async fn add_project_members(&self, project: &TargetId, members: &[TargetId]) -> Result<()>;
}
