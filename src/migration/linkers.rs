//! Relationship units of work, run after every creation phase
//!
//! A linker resolves an entity's reference fields through the identifier
//! map and silently drops whatever is unmapped. Where the target API takes
//! a batch, one call is issued per entity; otherwise one per reference.
//!
//! Ordered item lists (subtasks, project tasks, tag tasks, assignments) are
//! attached in reverse: the target inserts each new item at the top, so
//! reversing reproduces the source order.

use super::context::RunContext;
use crate::error::ItemError;
use crate::model::*;
use tracing::warn;

/// The owning entity's own target id; an uncreated owner skips the link.
fn owner(ctx: &RunContext, kind: EntityKind, source_id: &SourceId) -> Result<TargetId, ItemError> {
    ctx.ids
        .get(kind, source_id)
        .ok_or_else(|| ItemError::skipped(kind, source_id, format!("{} was not created", kind)))
}

/// Resolve references, skipping the link when none of them are mapped.
fn resolved(
    ctx: &RunContext,
    kind: EntityKind,
    source_id: &SourceId,
    ref_kind: EntityKind,
    refs: &[SourceId],
) -> Result<Vec<TargetId>, ItemError> {
    let targets = ctx.ids.resolve(ref_kind, refs);
    if targets.is_empty() {
        return Err(ItemError::skipped(
            kind,
            source_id,
            format!("none of {} referenced {}s resolved", refs.len(), ref_kind),
        ));
    }
    Ok(targets)
}

/// Outcome of attaching references one at a time
struct LinkTally {
    relationship: &'static str,
    attempted: usize,
    rejected: usize,
    first_error: Option<String>,
}

impl LinkTally {
    fn new(relationship: &'static str) -> Self {
        Self {
            relationship,
            attempted: 0,
            rejected: 0,
            first_error: None,
        }
    }

    fn record(&mut self, parent: &TargetId, child: &TargetId, result: anyhow::Result<()>) {
        self.attempted += 1;
        if let Err(e) = result {
            warn!(
                relationship = self.relationship,
                parent = %parent,
                child = %child,
                "Failed to link: {:#}",
                e
            );
            self.rejected += 1;
            self.first_error.get_or_insert_with(|| format!("{:#}", e));
        }
    }

    fn finish(
        self,
        kind: EntityKind,
        source_id: &SourceId,
        parent: &TargetId,
    ) -> Result<(), ItemError> {
        match self.first_error {
            None => Ok(()),
            Some(first) => Err(ItemError::link(
                self.relationship,
                kind,
                source_id,
                parent,
                format!(
                    "{} of {} rejected (first: {})",
                    self.rejected, self.attempted, first
                ),
            )),
        }
    }
}

fn batch_result(
    relationship: &'static str,
    kind: EntityKind,
    source_id: &SourceId,
    parent: &TargetId,
    result: anyhow::Result<()>,
) -> Result<(), ItemError> {
    result.map_err(|e| ItemError::link(relationship, kind, source_id, parent, format!("{:#}", e)))
}

// ============================================================================
// Item lists
// ============================================================================

pub async fn add_subtasks(ctx: &RunContext, task: &Task) -> Result<(), ItemError> {
    let parent = owner(ctx, EntityKind::Task, &task.source_id)?;
    let mut subtasks = resolved(
        ctx,
        EntityKind::Task,
        &task.source_id,
        EntityKind::Task,
        &task.source_item_ids,
    )?;
    subtasks.reverse();

    let mut tally = LinkTally::new("subtasks");
    for subtask in &subtasks {
        let result = ctx.remote.add_subtask(&parent, subtask).await;
        tally.record(&parent, subtask, result);
    }
    tally.finish(EntityKind::Task, &task.source_id, &parent)
}

pub async fn add_tasks_to_project(ctx: &RunContext, project: &Project) -> Result<(), ItemError> {
    let parent = owner(ctx, EntityKind::Project, &project.source_id)?;
    let mut tasks = resolved(
        ctx,
        EntityKind::Project,
        &project.source_id,
        EntityKind::Task,
        &project.source_item_ids,
    )?;
    tasks.reverse();

    let mut tally = LinkTally::new("project tasks");
    for task in &tasks {
        let result = ctx.remote.add_task_to_project(&parent, task).await;
        tally.record(&parent, task, result);
    }
    tally.finish(EntityKind::Project, &project.source_id, &parent)
}

pub async fn add_tasks_to_tag(ctx: &RunContext, tag: &Tag) -> Result<(), ItemError> {
    let parent = owner(ctx, EntityKind::Tag, &tag.source_id)?;
    let mut tasks = resolved(
        ctx,
        EntityKind::Tag,
        &tag.source_id,
        EntityKind::Task,
        &tag.source_item_ids,
    )?;
    tasks.reverse();

    let mut tally = LinkTally::new("tag tasks");
    for task in &tasks {
        let result = ctx.remote.add_tag_to_task(&parent, task).await;
        tally.record(&parent, task, result);
    }
    tally.finish(EntityKind::Tag, &tag.source_id, &parent)
}

// ============================================================================
// Assignment
// ============================================================================

pub async fn add_assignments(ctx: &RunContext, user: &User) -> Result<(), ItemError> {
    let assignee = owner(ctx, EntityKind::User, &user.source_id)?;
    let mut tasks = resolved(
        ctx,
        EntityKind::User,
        &user.source_id,
        EntityKind::Task,
        &user.source_item_ids,
    )?;
    tasks.reverse();

    let mut tally = LinkTally::new("assigned tasks");
    for task in &tasks {
        let result = ctx.remote.set_assignee(task, &assignee).await;
        tally.record(&assignee, task, result);
    }
    tally.finish(EntityKind::User, &user.source_id, &assignee)
}

/// Only valid once assignees are set: assigning clears the status.
pub async fn add_assignee_status(ctx: &RunContext, task: &Task) -> Result<(), ItemError> {
    let status = task.assignee_status.ok_or_else(|| {
        ItemError::skipped(EntityKind::Task, &task.source_id, "no assignee status")
    })?;
    let target = owner(ctx, EntityKind::Task, &task.source_id)?;
    let result = ctx.remote.set_assignee_status(&target, status).await;
    batch_result("assignee status", EntityKind::Task, &task.source_id, &target, result)
}

// ============================================================================
// Followers and members
// ============================================================================

pub async fn add_task_followers(ctx: &RunContext, task: &Task) -> Result<(), ItemError> {
    let target = owner(ctx, EntityKind::Task, &task.source_id)?;
    let followers = resolved(
        ctx,
        EntityKind::Task,
        &task.source_id,
        EntityKind::User,
        &task.source_follower_ids,
    )?;
    let result = ctx.remote.add_task_followers(&target, &followers).await;
    batch_result("followers", EntityKind::Task, &task.source_id, &target, result)
}

pub async fn add_project_followers(ctx: &RunContext, project: &Project) -> Result<(), ItemError> {
    let target = owner(ctx, EntityKind::Project, &project.source_id)?;
    let followers = resolved(
        ctx,
        EntityKind::Project,
        &project.source_id,
        EntityKind::User,
        &project.source_follower_ids,
    )?;
    let result = ctx.remote.add_project_followers(&target, &followers).await;
    batch_result("followers", EntityKind::Project, &project.source_id, &target, result)
}

/// Teams take members one at a time.
pub async fn add_team_members(ctx: &RunContext, team: &Team) -> Result<(), ItemError> {
    let target = owner(ctx, EntityKind::Team, &team.source_id)?;
    let members = resolved(
        ctx,
        EntityKind::Team,
        &team.source_id,
        EntityKind::User,
        &team.source_member_ids,
    )?;

    let mut tally = LinkTally::new("members");
    for member in &members {
        let result = ctx.remote.add_team_member(&target, member).await;
        tally.record(&target, member, result);
    }
    tally.finish(EntityKind::Team, &team.source_id, &target)
}

pub async fn add_project_members(ctx: &RunContext, project: &Project) -> Result<(), ItemError> {
    let target = owner(ctx, EntityKind::Project, &project.source_id)?;
    let members = resolved(
        ctx,
        EntityKind::Project,
        &project.source_id,
        EntityKind::User,
        &project.source_member_ids,
    )?;
    let result = ctx.remote.add_project_members(&target, &members).await;
    batch_result("members", EntityKind::Project, &project.source_id, &target, result)
}
