//! Source records as read from an export
//!
//! Every record is immutable once loaded. Reference fields hold the
//! `SourceId`s of related records; they are resolved to target ids while
//! the pipeline runs.

use super::ids::SourceId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A team and the users that belong to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub source_id: SourceId,
    pub name: String,
    #[serde(default)]
    pub source_member_ids: Vec<SourceId>,
}

/// A project owned by a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub source_id: SourceId,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub source_team_id: Option<SourceId>,
    /// Tasks contained in the project, in display order
    #[serde(default)]
    pub source_item_ids: Vec<SourceId>,
    #[serde(default)]
    pub source_follower_ids: Vec<SourceId>,
    #[serde(default)]
    pub source_member_ids: Vec<SourceId>,
}

/// A tag, optionally scoped to a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub source_id: SourceId,
    pub name: String,
    #[serde(default)]
    pub source_team_id: Option<SourceId>,
    /// Tasks carrying the tag
    #[serde(default)]
    pub source_item_ids: Vec<SourceId>,
}

/// Where a task sits in its assignee's list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeStatus {
    Inbox,
    Later,
    Today,
    Upcoming,
}

impl AssigneeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssigneeStatus::Inbox => "inbox",
            AssigneeStatus::Later => "later",
            AssigneeStatus::Today => "today",
            AssigneeStatus::Upcoming => "upcoming",
        }
    }
}

/// A task with its comment stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub source_id: SourceId,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_on: Option<NaiveDate>,
    #[serde(default)]
    pub assignee_status: Option<AssigneeStatus>,
    /// Subtasks, in display order
    #[serde(default)]
    pub source_item_ids: Vec<SourceId>,
    #[serde(default)]
    pub source_follower_ids: Vec<SourceId>,
    #[serde(default)]
    pub stories: Vec<Story>,
}

/// A comment attached to a task. Stories are never referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub text: String,
}

/// A file or link attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub source_id: SourceId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// The task the attachment hangs off
    pub source_parent_id: SourceId,
}

/// A user and the tasks assigned to them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub source_id: SourceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Tasks assigned to the user
    #[serde(default)]
    pub source_item_ids: Vec<SourceId>,
}

impl User {
    /// The contact address, if the export carries a non-blank one
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
