//! Phases and the runner that drives one phase to completion

use super::limiter::ConcurrencyLimiter;
use crate::error::{ItemError, MigrationError};
use crate::events::EventEmitter;
use crate::export::SourceRecord;
use futures::StreamExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Every stage of the pipeline, in the order it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ImportTeams,
    ImportProjects,
    ImportTags,
    ImportTasks,
    ImportStories,
    ImportAttachments,
    AddSubtasksToTasks,
    AddTasksToProjects,
    AddTasksToTags,
    ImportUsers,
    AddAssigneesToTasks,
    /// Must follow `AddAssigneesToTasks`: assigning a task clears its status
    AddAssigneeStatuses,
    AddFollowersToTasks,
    AddFollowersToProjects,
    AddMembersToTeams,
    AddMembersToProjects,
}

impl Phase {
    pub const ALL: [Phase; 16] = [
        Phase::ImportTeams,
        Phase::ImportProjects,
        Phase::ImportTags,
        Phase::ImportTasks,
        Phase::ImportStories,
        Phase::ImportAttachments,
        Phase::AddSubtasksToTasks,
        Phase::AddTasksToProjects,
        Phase::AddTasksToTags,
        Phase::ImportUsers,
        Phase::AddAssigneesToTasks,
        Phase::AddAssigneeStatuses,
        Phase::AddFollowersToTasks,
        Phase::AddFollowersToProjects,
        Phase::AddMembersToTeams,
        Phase::AddMembersToProjects,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::ImportTeams => "import teams",
            Phase::ImportProjects => "import projects",
            Phase::ImportTags => "import tags",
            Phase::ImportTasks => "import tasks",
            Phase::ImportStories => "import stories",
            Phase::ImportAttachments => "import attachments",
            Phase::AddSubtasksToTasks => "add subtasks to tasks",
            Phase::AddTasksToProjects => "add tasks to projects",
            Phase::AddTasksToTags => "add tasks to tags",
            Phase::ImportUsers => "import users",
            Phase::AddAssigneesToTasks => "add assignees to tasks",
            Phase::AddAssigneeStatuses => "add assignee statuses",
            Phase::AddFollowersToTasks => "add followers to tasks",
            Phase::AddFollowersToProjects => "add followers to projects",
            Phase::AddMembersToTeams => "add members to teams",
            Phase::AddMembersToProjects => "add members to projects",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::ImportTeams => "importing teams",
            Phase::ImportProjects => "importing projects",
            Phase::ImportTags => "importing tags",
            Phase::ImportTasks => "importing tasks",
            Phase::ImportStories => "importing stories for tasks",
            Phase::ImportAttachments => "importing attachments",
            Phase::AddSubtasksToTasks => "adding subtasks to tasks",
            Phase::AddTasksToProjects => "adding tasks to projects",
            Phase::AddTasksToTags => "adding tasks to tags",
            Phase::ImportUsers => "importing users",
            Phase::AddAssigneesToTasks => "assigning tasks to users",
            Phase::AddAssigneeStatuses => "adding assignee status to tasks",
            Phase::AddFollowersToTasks => "adding followers to tasks",
            Phase::AddFollowersToProjects => "adding followers to projects",
            Phase::AddMembersToTeams => "adding members to teams",
            Phase::AddMembersToProjects => "adding members to projects",
        }
    }
}

/// Result of one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Skipped(String),
    Failed(String),
}

/// Per-phase counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PhaseReport {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.attempted += 1;
        match outcome {
            ItemOutcome::Succeeded => self.succeeded += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &PhaseReport) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Drives one phase: fans a unit of work out over a collection and fans
/// back in once every item has finished.
///
/// Per-item errors are logged and counted. Only `ItemError::Fatal` stops
/// the phase, abandoning whatever is still in flight.
pub struct PhaseRunner {
    limiter: ConcurrencyLimiter,
    events: Option<Arc<dyn EventEmitter>>,
}

impl PhaseRunner {
    pub fn new(limiter: ConcurrencyLimiter) -> Self {
        Self {
            limiter,
            events: None,
        }
    }

    /// Report progress to the given sink
    pub fn with_events(mut self, events: Arc<dyn EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn limiter(&self) -> ConcurrencyLimiter {
        self.limiter
    }

    pub async fn run<T, F, Fut>(
        &self,
        phase: Phase,
        items: Vec<T>,
        op: F,
    ) -> Result<PhaseReport, MigrationError>
    where
        T: SourceRecord,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), ItemError>>,
    {
        let events = self.events.as_deref();
        let total = items.len();
        info!(
            phase = phase.name(),
            total,
            concurrency = self.limiter.ceiling(),
            "started {}",
            phase.description()
        );
        if let Some(events) = events {
            events.emit_phase_started(phase, total);
        }

        let op = &op;
        let results = self
            .limiter
            .fan_out(items.into_iter().enumerate(), |(index, item)| {
                let source_id = item.source_id().clone();
                async move {
                    if let Some(events) = events {
                        events.emit_item_started(phase, index, &source_id);
                    }
                    let result = op(item).await;
                    (index, source_id, result)
                }
            });
        futures::pin_mut!(results);

        let mut report = PhaseReport::default();
        while let Some((index, source_id, result)) = results.next().await {
            let outcome = match result {
                Ok(()) => ItemOutcome::Succeeded,
                Err(ItemError::Skipped { reason, .. }) => {
                    debug!(
                        phase = phase.name(),
                        kind = %T::KIND,
                        source_id = %source_id,
                        reason = %reason,
                        "Skipped"
                    );
                    ItemOutcome::Skipped(reason)
                }
                Err(ItemError::Fatal(err)) => {
                    error!(
                        phase = phase.name(),
                        kind = %T::KIND,
                        source_id = %source_id,
                        "Aborting phase: {}",
                        err
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        phase = phase.name(),
                        kind = %T::KIND,
                        source_id = %source_id,
                        "{}",
                        err
                    );
                    ItemOutcome::Failed(err.to_string())
                }
            };
            report.record(&outcome);
            if let Some(events) = events {
                events.emit_item_completed(phase, index, &source_id, &outcome);
            }
        }

        info!(
            phase = phase.name(),
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "completed {}",
            phase.description()
        );
        if let Some(events) = events {
            events.emit_phase_completed(phase, &report);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, ProgressStage};
    use crate::model::{EntityKind, SourceId, Team, TargetId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn teams(n: usize) -> Vec<Team> {
        (0..n)
            .map(|i| Team {
                source_id: SourceId::new(format!("t{i}")),
                name: format!("Team {i}"),
                source_member_ids: vec![],
            })
            .collect()
    }

    #[test]
    fn test_phase_order_is_declaration_order() {
        assert_eq!(Phase::ALL.first(), Some(&Phase::ImportTeams));
        assert_eq!(Phase::ALL.last(), Some(&Phase::AddMembersToProjects));
        let assign = Phase::ALL
            .iter()
            .position(|p| *p == Phase::AddAssigneesToTasks)
            .unwrap();
        let status = Phase::ALL
            .iter()
            .position(|p| *p == Phase::AddAssigneeStatuses)
            .unwrap();
        let users = Phase::ALL
            .iter()
            .position(|p| *p == Phase::ImportUsers)
            .unwrap();
        assert!(users < assign);
        assert!(assign < status);
    }

    #[tokio::test]
    async fn test_failures_and_skips_do_not_stop_siblings() {
        let runner = PhaseRunner::new(ConcurrencyLimiter::new(4));
        let calls = AtomicUsize::new(0);

        let report = runner
            .run(Phase::ImportTeams, teams(9), |team| {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    match team.source_id.as_str() {
                        "t1" | "t4" => Err(ItemError::CreationFailure {
                            kind: EntityKind::Team,
                            source_id: team.source_id.clone(),
                            target_parent: None,
                            reason: "boom".into(),
                        }),
                        "t2" => Err(ItemError::skipped(
                            EntityKind::Team,
                            &team.source_id,
                            "nothing to do",
                        )),
                        _ => Ok(()),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert_eq!(
            report,
            PhaseReport {
                attempted: 9,
                succeeded: 6,
                failed: 2,
                skipped: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_phase() {
        let runner = PhaseRunner::new(ConcurrencyLimiter::new(1));
        let result = runner
            .run(Phase::ImportTeams, teams(5), |team| async move {
                if team.source_id.as_str() == "t2" {
                    Err(ItemError::Fatal(MigrationError::DuplicateKey {
                        kind: EntityKind::Team,
                        source_id: team.source_id.clone(),
                        existing: TargetId::new("a"),
                        attempted: TargetId::new("b"),
                    }))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(MigrationError::DuplicateKey { .. })));
    }

    #[tokio::test]
    async fn test_emits_progress_events() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let runner = PhaseRunner::new(ConcurrencyLimiter::new(2)).with_events(bus.clone());

        runner
            .run(Phase::ImportTeams, teams(2), |_| async { Ok::<(), ItemError>(()) })
            .await
            .unwrap();

        let mut stages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.phase, Phase::ImportTeams);
            stages.push(event.stage);
        }
        assert_eq!(stages.len(), 6);
        assert!(matches!(
            stages.first(),
            Some(ProgressStage::PhaseStarted { total: 2, .. })
        ));
        let started = stages
            .iter()
            .filter(|s| matches!(s, ProgressStage::ItemStarted { .. }))
            .count();
        let completed = stages
            .iter()
            .filter(|s| {
                matches!(
                    s,
                    ProgressStage::ItemCompleted {
                        outcome: ItemOutcome::Succeeded,
                        ..
                    }
                )
            })
            .count();
        assert_eq!((started, completed), (2, 2));
        assert!(matches!(
            stages.last(),
            Some(ProgressStage::PhaseCompleted { report }) if report.succeeded == 2
        ));
    }

    #[tokio::test]
    async fn test_empty_phase_reports_zero() {
        let runner = PhaseRunner::new(ConcurrencyLimiter::default());
        let report = runner
            .run(Phase::ImportUsers, Vec::<Team>::new(), |_| async { Ok::<(), ItemError>(()) })
            .await
            .unwrap();
        assert_eq!(report, PhaseReport::default());
    }
}
