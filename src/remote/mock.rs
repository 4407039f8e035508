//! In-memory mock implementation of RemoteApi for testing.
//!
//! Assigns deterministic target ids (`team-1`, `task-2`, ...), records every
//! call in order, and can be told to reject specific creates or attaches.

use super::traits::{ExistingTag, RemoteApi};
use crate::model::*;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// One call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreateTeam { name: String },
    CreateProject { name: String, team: TargetId },
    CreateTag { name: String, team: Option<TargetId> },
    CreateTask { name: String },
    CreateAttachment { name: String, task: TargetId },
    CreateUser { email: String },
    AddStory { task: TargetId, text: String },
    ExistingTags { workspace: TargetId },
    AddSubtask { parent: TargetId, subtask: TargetId },
    AddTaskToProject { project: TargetId, task: TargetId },
    AddTagToTask { tag: TargetId, task: TargetId },
    SetAssignee { task: TargetId, user: TargetId },
    SetAssigneeStatus { task: TargetId, status: AssigneeStatus },
    AddTaskFollowers { task: TargetId, followers: Vec<TargetId> },
    AddProjectFollowers { project: TargetId, followers: Vec<TargetId> },
    AddTeamMember { team: TargetId, user: TargetId },
    AddProjectMembers { project: TargetId, members: Vec<TargetId> },
}

/// In-memory mock implementation of RemoteApi for testing.
#[derive(Default)]
pub struct MockRemoteApi {
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Option<Duration>,
    pub existing_tags: RwLock<Vec<ExistingTag>>,
    /// Creates whose name (or email) is in this set are rejected
    pub failing_creates: RwLock<HashSet<String>>,
    /// Attaches whose parent target id is in this set are rejected
    pub failing_parents: RwLock<HashSet<TargetId>>,
    pub calls: RwLock<Vec<RemoteCall>>,
}

impl MockRemoteApi {
    /// Create a new empty MockRemoteApi.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Builder / seeding methods for tests
    // ========================================================================

    /// Seed a tag that already exists in the workspace.
    pub fn with_existing_tag(mut self, id: &str, name: &str) -> Self {
        self.existing_tags.get_mut().push(ExistingTag {
            id: TargetId::new(id),
            name: name.to_string(),
        });
        self
    }

    /// Reject any create call for an entity with this name or email.
    pub fn failing_create(mut self, name: &str) -> Self {
        self.failing_creates.get_mut().insert(name.to_string());
        self
    }

    /// Reject any attach call whose parent is this target id.
    pub fn failing_parent(mut self, parent: &str) -> Self {
        self.failing_parents.get_mut().insert(TargetId::new(parent));
        self
    }

    /// Hold every call for this long, so concurrent calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Snapshot of every call received so far
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.read().await.clone()
    }

    /// Highest number of calls that were in progress at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn record(&self, call: RemoteCall) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
        self.calls.write().await.push(call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn create(&self, prefix: &str, name: &str, call: RemoteCall) -> Result<TargetId> {
        self.record(call).await;
        if self.failing_creates.read().await.contains(name) {
            anyhow::bail!("{} '{}' rejected by mock", prefix, name);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TargetId::new(format!("{}-{}", prefix, n)))
    }

    async fn attach(&self, parent: &TargetId, call: RemoteCall) -> Result<()> {
        self.record(call).await;
        if self.failing_parents.read().await.contains(parent) {
            anyhow::bail!("attach to {} rejected by mock", parent);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn create_team(&self, req: &CreateTeamRequest) -> Result<TargetId> {
        let call = RemoteCall::CreateTeam {
            name: req.name.clone(),
        };
        self.create("team", &req.name, call).await
    }

    async fn create_project(&self, req: &CreateProjectRequest) -> Result<TargetId> {
        let call = RemoteCall::CreateProject {
            name: req.name.clone(),
            team: req.team.clone(),
        };
        self.create("project", &req.name, call).await
    }

    async fn create_tag(&self, req: &CreateTagRequest) -> Result<TargetId> {
        let call = RemoteCall::CreateTag {
            name: req.name.clone(),
            team: req.team.clone(),
        };
        self.create("tag", &req.name, call).await
    }

    async fn create_task(&self, req: &CreateTaskRequest) -> Result<TargetId> {
        let call = RemoteCall::CreateTask {
            name: req.name.clone(),
        };
        self.create("task", &req.name, call).await
    }

    async fn create_attachment(&self, req: &CreateAttachmentRequest) -> Result<TargetId> {
        let call = RemoteCall::CreateAttachment {
            name: req.name.clone(),
            task: req.task.clone(),
        };
        self.create("attachment", &req.name, call).await
    }

    async fn create_user(&self, req: &CreateUserRequest) -> Result<TargetId> {
        let call = RemoteCall::CreateUser {
            email: req.email.clone(),
        };
        self.create("user", &req.email, call).await
    }

    async fn add_story(&self, task: &TargetId, text: &str) -> Result<()> {
        let call = RemoteCall::AddStory {
            task: task.clone(),
            text: text.to_string(),
        };
        self.attach(task, call).await
    }

    async fn existing_tags(&self, workspace: &TargetId) -> Result<Vec<ExistingTag>> {
        self.record(RemoteCall::ExistingTags {
            workspace: workspace.clone(),
        })
        .await;
        Ok(self.existing_tags.read().await.clone())
    }

    async fn add_subtask(&self, parent: &TargetId, subtask: &TargetId) -> Result<()> {
        let call = RemoteCall::AddSubtask {
            parent: parent.clone(),
            subtask: subtask.clone(),
        };
        self.attach(parent, call).await
    }

    async fn add_task_to_project(&self, project: &TargetId, task: &TargetId) -> Result<()> {
        let call = RemoteCall::AddTaskToProject {
            project: project.clone(),
            task: task.clone(),
        };
        self.attach(project, call).await
    }

    async fn add_tag_to_task(&self, tag: &TargetId, task: &TargetId) -> Result<()> {
        let call = RemoteCall::AddTagToTask {
            tag: tag.clone(),
            task: task.clone(),
        };
        self.attach(tag, call).await
    }

    async fn set_assignee(&self, task: &TargetId, user: &TargetId) -> Result<()> {
        let call = RemoteCall::SetAssignee {
            task: task.clone(),
            user: user.clone(),
        };
        self.attach(user, call).await
    }

    async fn set_assignee_status(&self, task: &TargetId, status: AssigneeStatus) -> Result<()> {
        let call = RemoteCall::SetAssigneeStatus {
            task: task.clone(),
            status,
        };
        self.attach(task, call).await
    }

    async fn add_task_followers(&self, task: &TargetId, followers: &[TargetId]) -> Result<()> {
        let call = RemoteCall::AddTaskFollowers {
            task: task.clone(),
            followers: followers.to_vec(),
        };
        self.attach(task, call).await
    }

    async fn add_project_followers(
        &self,
        project: &TargetId,
        followers: &[TargetId],
    ) -> Result<()> {
        let call = RemoteCall::AddProjectFollowers {
            project: project.clone(),
            followers: followers.to_vec(),
        };
        self.attach(project, call).await
    }

    async fn add_team_member(&self, team: &TargetId, user: &TargetId) -> Result<()> {
        let call = RemoteCall::AddTeamMember {
            team: team.clone(),
            user: user.clone(),
        };
        self.attach(team, call).await
    }

    async fn add_project_members(&self, project: &TargetId, members: &[TargetId]) -> Result<()> {
        let call = RemoteCall::AddProjectMembers {
            project: project.clone(),
            members: members.to_vec(),
        };
        self.attach(project, call).await
    }
}
