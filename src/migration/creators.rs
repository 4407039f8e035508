//! Creation units of work, one per entity kind
//!
//! Each creator resolves the foreign keys it needs, builds a complete
//! request and issues one create call. Only a successful create publishes
//! a mapping; skips and failures leave the source id unresolved.

use super::context::RunContext;
use crate::error::ItemError;
use crate::model::*;
use crate::remote::ExistingTag;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Name → id of the tags already in the workspace. The first tag wins
/// when the workspace holds duplicates.
pub fn existing_tag_index(tags: Vec<ExistingTag>) -> HashMap<String, TargetId> {
    let mut index = HashMap::with_capacity(tags.len());
    for tag in tags {
        index.entry(tag.name).or_insert(tag.id);
    }
    index
}

fn publish(
    ctx: &RunContext,
    kind: EntityKind,
    source_id: &SourceId,
    target_parent: Option<&TargetId>,
    created: anyhow::Result<TargetId>,
) -> Result<(), ItemError> {
    let target_id = created.map_err(|e| ItemError::creation(kind, source_id, target_parent, e))?;
    debug!(kind = %kind, source_id = %source_id, target_id = %target_id, "Created");
    ctx.ids.put(kind, source_id, target_id)?;
    Ok(())
}

/// Resolve a required parent, skipping the item when it is unmapped.
fn require_parent(
    ctx: &RunContext,
    kind: EntityKind,
    source_id: &SourceId,
    parent_kind: EntityKind,
    parent: Option<&SourceId>,
) -> Result<TargetId, ItemError> {
    let parent = parent.ok_or_else(|| {
        ItemError::skipped(kind, source_id, format!("no {} referenced", parent_kind))
    })?;
    ctx.ids.get(parent_kind, parent).ok_or_else(|| {
        ItemError::skipped(
            kind,
            source_id,
            format!("{} {} was not created", parent_kind, parent),
        )
    })
}

pub async fn create_team(ctx: &RunContext, team: &Team) -> Result<(), ItemError> {
    let req = CreateTeamRequest::new(team, ctx.workspace());
    let created = ctx.remote.create_team(&req).await;
    publish(ctx, EntityKind::Team, &team.source_id, None, created)
}

/// A project cannot exist outside a team, so an unmapped team skips it.
pub async fn create_project(ctx: &RunContext, project: &Project) -> Result<(), ItemError> {
    let team = require_parent(
        ctx,
        EntityKind::Project,
        &project.source_id,
        EntityKind::Team,
        project.source_team_id.as_ref(),
    )?;
    let req = CreateProjectRequest::new(project, ctx.workspace(), team.clone());
    let created = ctx.remote.create_project(&req).await;
    publish(ctx, EntityKind::Project, &project.source_id, Some(&team), created)
}

/// Binds to a same-named existing tag instead of creating a duplicate.
pub async fn create_tag(
    ctx: &RunContext,
    existing: &HashMap<String, TargetId>,
    tag: &Tag,
) -> Result<(), ItemError> {
    if let Some(target_id) = existing.get(&tag.name) {
        debug!(
            source_id = %tag.source_id,
            target_id = %target_id,
            name = %tag.name,
            "Bound tag to existing target tag"
        );
        ctx.ids.put(EntityKind::Tag, &tag.source_id, target_id.clone())?;
        return Ok(());
    }

    let team = tag
        .source_team_id
        .as_ref()
        .and_then(|team| ctx.ids.get(EntityKind::Team, team));
    let req = CreateTagRequest::new(tag, ctx.workspace(), team.clone());
    let created = ctx.remote.create_tag(&req).await;
    publish(ctx, EntityKind::Tag, &tag.source_id, team.as_ref(), created)
}

pub async fn create_task(ctx: &RunContext, task: &Task) -> Result<(), ItemError> {
    let req = CreateTaskRequest::new(task, ctx.workspace());
    let created = ctx.remote.create_task(&req).await;
    publish(ctx, EntityKind::Task, &task.source_id, None, created)
}

/// Posts every story of a task. One rejected story does not stop the rest.
pub async fn create_stories(ctx: &RunContext, task: &Task) -> Result<(), ItemError> {
    if task.stories.is_empty() {
        return Err(ItemError::skipped(EntityKind::Story, &task.source_id, "no stories"));
    }
    let target = require_parent(
        ctx,
        EntityKind::Story,
        &task.source_id,
        EntityKind::Task,
        Some(&task.source_id),
    )?;

    let mut rejected = 0;
    let mut first_error = None;
    for (index, story) in task.stories.iter().enumerate() {
        if let Err(e) = ctx.remote.add_story(&target, &story.text).await {
            warn!(
                task = %task.source_id,
                target = %target,
                story = index,
                "Failed to add story: {:#}",
                e
            );
            rejected += 1;
            first_error.get_or_insert_with(|| format!("{:#}", e));
        }
    }

    match first_error {
        None => Ok(()),
        Some(first) => Err(ItemError::CreationFailure {
            kind: EntityKind::Story,
            source_id: task.source_id.clone(),
            target_parent: Some(target),
            reason: format!(
                "{} of {} stories rejected (first: {})",
                rejected,
                task.stories.len(),
                first
            ),
        }),
    }
}

pub async fn create_attachment(ctx: &RunContext, attachment: &Attachment) -> Result<(), ItemError> {
    let task = require_parent(
        ctx,
        EntityKind::Attachment,
        &attachment.source_id,
        EntityKind::Task,
        Some(&attachment.source_parent_id),
    )?;
    let req = CreateAttachmentRequest::new(attachment, task.clone());
    let created = ctx.remote.create_attachment(&req).await;
    publish(ctx, EntityKind::Attachment, &attachment.source_id, Some(&task), created)
}

/// Users without a contact address cannot be invited and are skipped.
pub async fn create_user(ctx: &RunContext, user: &User) -> Result<(), ItemError> {
    let req = CreateUserRequest::new(user, ctx.workspace()).ok_or_else(|| {
        ItemError::skipped(EntityKind::User, &user.source_id, "no contact address")
    })?;
    let created = ctx.remote.create_user(&req).await;
    publish(ctx, EntityKind::User, &user.source_id, None, created)
}
