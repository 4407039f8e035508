//! Top-level driver: export lifecycle plus the fixed phase sequence

use super::context::RunContext;
use super::creators::{self, existing_tag_index};
use super::limiter::ConcurrencyLimiter;
use super::linkers;
use super::phase::{Phase, PhaseReport, PhaseRunner};
use crate::error::{ItemError, MigrationError, PhaseLabel, RunFailure};
use crate::export::{Export, SourceRecord};
use crate::model::*;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Counts for one completed phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    #[serde(flatten)]
    pub report: PhaseReport,
}

/// Per-phase counts for a whole run, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub phases: Vec<PhaseSummary>,
}

impl MigrationReport {
    pub fn get(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases
            .iter()
            .find(|s| s.phase == phase)
            .map(|s| &s.report)
    }

    pub fn last_completed(&self) -> Option<Phase> {
        self.phases.last().map(|s| s.phase)
    }

    pub fn totals(&self) -> PhaseReport {
        let mut totals = PhaseReport::default();
        for summary in &self.phases {
            totals.merge(&summary.report);
        }
        totals
    }

    fn push(&mut self, phase: Phase, report: PhaseReport) {
        self.phases.push(PhaseSummary { phase, report });
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, r: &PhaseReport| {
            writeln!(
                f,
                "{:<28} {:>9} {:>9} {:>9} {:>9}",
                name, r.attempted, r.succeeded, r.failed, r.skipped
            )
        };
        writeln!(
            f,
            "{:<28} {:>9} {:>9} {:>9} {:>9}",
            "phase", "attempted", "succeeded", "failed", "skipped"
        )?;
        for summary in &self.phases {
            row(f, summary.phase.name(), &summary.report)?;
        }
        row(f, "total", &self.totals())
    }
}

/// Runs every phase in order against one export and one target workspace.
pub struct MigrationOrchestrator {
    export: Arc<dyn Export>,
    ctx: RunContext,
    runner: PhaseRunner,
}

impl MigrationOrchestrator {
    pub fn new(export: Arc<dyn Export>, ctx: RunContext) -> Self {
        let mut runner = PhaseRunner::new(ConcurrencyLimiter::new(ctx.settings.concurrency));
        if let Some(events) = &ctx.events {
            runner = runner.with_events(events.clone());
        }
        Self {
            export,
            ctx,
            runner,
        }
    }

    /// The run's context, including the identifier map built so far
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Execute the whole pipeline.
    ///
    /// Cleanup is attempted whenever prepare succeeded, even after a fatal
    /// error; in that case a cleanup failure is only logged.
    pub async fn run(&self) -> Result<MigrationReport, RunFailure> {
        let started = Instant::now();
        info!(
            workspace = %self.ctx.workspace(),
            concurrency = self.runner.limiter().ceiling(),
            "Starting migration"
        );

        self.export
            .prepare_for_import()
            .await
            .map_err(|e| RunFailure {
                failed_phase: PhaseLabel::Prepare,
                last_completed_phase: None,
                source: MigrationError::Lifecycle {
                    stage: "prepare",
                    reason: format!("{:#}", e),
                },
            })?;

        let mut report = MigrationReport::default();
        let outcome = self.run_phases(&mut report).await;
        let cleanup = self.export.cleanup_after_import().await;

        match (outcome, cleanup) {
            (Err(failure), cleanup) => {
                if let Err(e) = cleanup {
                    warn!("Export cleanup after aborted run failed: {:#}", e);
                }
                error!("{}", failure);
                Err(failure)
            }
            (Ok(()), Err(e)) => Err(RunFailure {
                failed_phase: PhaseLabel::Cleanup,
                last_completed_phase: report.last_completed(),
                source: MigrationError::Lifecycle {
                    stage: "cleanup",
                    reason: format!("{:#}", e),
                },
            }),
            (Ok(()), Ok(())) => {
                let totals = report.totals();
                info!(
                    attempted = totals.attempted,
                    succeeded = totals.succeeded,
                    failed = totals.failed,
                    skipped = totals.skipped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Migration finished"
                );
                Ok(report)
            }
        }
    }

    async fn run_phases(&self, report: &mut MigrationReport) -> Result<(), RunFailure> {
        let ctx = &self.ctx;

        // Creation
        self.phase(report, Phase::ImportTeams, move |team: Team| async move {
            creators::create_team(ctx, &team).await
        })
        .await?;
        self.phase(report, Phase::ImportProjects, move |project: Project| async move {
            creators::create_project(ctx, &project).await
        })
        .await?;

        // Without the lookup every tag is created fresh.
        let existing = match ctx.remote.existing_tags(ctx.workspace()).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(
                    workspace = %ctx.workspace(),
                    "Failed to fetch existing tags, creating all tags: {:#}",
                    e
                );
                Vec::new()
            }
        };
        let existing = &existing_tag_index(existing);
        self.phase(report, Phase::ImportTags, move |tag: Tag| async move {
            creators::create_tag(ctx, existing, &tag).await
        })
        .await?;

        self.phase(report, Phase::ImportTasks, move |task: Task| async move {
            creators::create_task(ctx, &task).await
        })
        .await?;
        self.phase(report, Phase::ImportStories, move |task: Task| async move {
            creators::create_stories(ctx, &task).await
        })
        .await?;
        self.phase(report, Phase::ImportAttachments, move |a: Attachment| async move {
            creators::create_attachment(ctx, &a).await
        })
        .await?;

        // Item lists
        self.phase(report, Phase::AddSubtasksToTasks, move |task: Task| async move {
            linkers::add_subtasks(ctx, &task).await
        })
        .await?;
        self.phase(report, Phase::AddTasksToProjects, move |p: Project| async move {
            linkers::add_tasks_to_project(ctx, &p).await
        })
        .await?;
        self.phase(report, Phase::AddTasksToTags, move |tag: Tag| async move {
            linkers::add_tasks_to_tag(ctx, &tag).await
        })
        .await?;

        // People
        self.phase(report, Phase::ImportUsers, move |user: User| async move {
            creators::create_user(ctx, &user).await
        })
        .await?;
        self.phase(report, Phase::AddAssigneesToTasks, move |user: User| async move {
            linkers::add_assignments(ctx, &user).await
        })
        .await?;
        self.phase(report, Phase::AddAssigneeStatuses, move |task: Task| async move {
            linkers::add_assignee_status(ctx, &task).await
        })
        .await?;
        self.phase(report, Phase::AddFollowersToTasks, move |task: Task| async move {
            linkers::add_task_followers(ctx, &task).await
        })
        .await?;
        self.phase(report, Phase::AddFollowersToProjects, move |p: Project| async move {
            linkers::add_project_followers(ctx, &p).await
        })
        .await?;
        self.phase(report, Phase::AddMembersToTeams, move |team: Team| async move {
            linkers::add_team_members(ctx, &team).await
        })
        .await?;
        self.phase(report, Phase::AddMembersToProjects, move |p: Project| async move {
            linkers::add_project_members(ctx, &p).await
        })
        .await?;

        Ok(())
    }

    /// Load a fresh collection for `T` and run `op` over it.
    async fn phase<T, F, Fut>(
        &self,
        report: &mut MigrationReport,
        phase: Phase,
        op: F,
    ) -> Result<(), RunFailure>
    where
        T: SourceRecord,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), ItemError>>,
    {
        let items = T::load(self.export.as_ref()).await.map_err(|e| {
            failure(
                report,
                phase,
                MigrationError::Export {
                    kind: T::KIND,
                    reason: format!("{:#}", e),
                },
            )
        })?;

        let phase_report = self
            .runner
            .run(phase, items, op)
            .await
            .map_err(|e| failure(report, phase, e))?;
        report.push(phase, phase_report);
        Ok(())
    }
}

fn failure(report: &MigrationReport, phase: Phase, source: MigrationError) -> RunFailure {
    RunFailure {
        failed_phase: PhaseLabel::Phase(phase),
        last_completed_phase: report.last_completed(),
        source,
    }
}
