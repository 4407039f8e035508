//! Create requests sent to the target workspace
//!
//! Each request is built in full from a source record plus its resolved
//! foreign keys, then handed to the remote in a single call.

use super::entities::{Attachment, Project, Tag, Task, Team, User};
use super::ids::TargetId;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTeamRequest {
    pub organization: TargetId,
    pub name: String,
}

impl CreateTeamRequest {
    pub fn new(team: &Team, organization: &TargetId) -> Self {
        Self {
            organization: organization.clone(),
            name: team.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateProjectRequest {
    pub workspace: TargetId,
    pub team: TargetId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CreateProjectRequest {
    pub fn new(project: &Project, workspace: &TargetId, team: TargetId) -> Self {
        Self {
            workspace: workspace.clone(),
            team,
            name: project.name.clone(),
            notes: project.notes.clone(),
            archived: project.archived,
            color: project.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTagRequest {
    pub workspace: TargetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TargetId>,
    pub name: String,
}

impl CreateTagRequest {
    pub fn new(tag: &Tag, workspace: &TargetId, team: Option<TargetId>) -> Self {
        Self {
            workspace: workspace.clone(),
            team,
            name: tag.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTaskRequest {
    pub workspace: TargetId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<NaiveDate>,
}

impl CreateTaskRequest {
    pub fn new(task: &Task, workspace: &TargetId) -> Self {
        Self {
            workspace: workspace.clone(),
            name: task.name.clone(),
            notes: task.notes.clone(),
            completed: task.completed,
            due_on: task.due_on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAttachmentRequest {
    #[serde(skip)]
    pub task: TargetId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CreateAttachmentRequest {
    pub fn new(attachment: &Attachment, task: TargetId) -> Self {
        Self {
            task,
            name: attachment.name.clone(),
            url: attachment.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateUserRequest {
    #[serde(skip)]
    pub workspace: TargetId,
    #[serde(rename = "user")]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CreateUserRequest {
    /// Returns `None` when the user has no usable contact address.
    pub fn new(user: &User, workspace: &TargetId) -> Option<Self> {
        let email = user.contact_email()?;
        Some(Self {
            workspace: workspace.clone(),
            email: email.to_string(),
            name: user.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceId;

    #[test]
    fn test_project_request_omits_empty_optionals() {
        let project = Project {
            source_id: SourceId::new("p1"),
            name: "Roadmap".into(),
            notes: None,
            archived: false,
            color: None,
            source_team_id: Some(SourceId::new("t1")),
            source_item_ids: vec![],
            source_follower_ids: vec![],
            source_member_ids: vec![],
        };
        let req = CreateProjectRequest::new(&project, &TargetId::new("ws"), TargetId::new("T1"));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["team"], "T1");
        assert_eq!(json["workspace"], "ws");
        assert!(json.get("notes").is_none());
        assert!(json.get("color").is_none());
    }

    #[test]
    fn test_user_request_requires_email() {
        let mut user = User {
            source_id: SourceId::new("u1"),
            name: Some("Ada".into()),
            email: None,
            source_item_ids: vec![],
        };
        assert!(CreateUserRequest::new(&user, &TargetId::new("ws")).is_none());

        user.email = Some("ada@example.com".into());
        let req = CreateUserRequest::new(&user, &TargetId::new("ws")).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["user"], "ada@example.com");
        assert!(json.get("workspace").is_none());
    }
}
