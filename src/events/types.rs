//! Progress event types

use crate::migration::{ItemOutcome, Phase, PhaseReport};
use crate::model::SourceId;
use serde::Serialize;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressStage {
    PhaseStarted {
        description: String,
        total: usize,
    },
    ItemStarted {
        index: usize,
        source_id: SourceId,
    },
    ItemCompleted {
        index: usize,
        source_id: SourceId,
        outcome: ItemOutcome,
    },
    PhaseCompleted {
        report: PhaseReport,
    },
}

/// A progress notification emitted by the phase runner
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    #[serde(flatten)]
    pub stage: ProgressStage,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl ProgressEvent {
    /// Create a new ProgressEvent with the current timestamp
    pub fn new(phase: Phase, stage: ProgressStage) -> Self {
        Self {
            phase,
            stage,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Receiver of progress notifications
///
/// Implementations must not block: the phase runner calls `emit` inline
/// between units of work.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    fn emit_phase_started(&self, phase: Phase, total: usize) {
        self.emit(ProgressEvent::new(
            phase,
            ProgressStage::PhaseStarted {
                description: phase.description().to_string(),
                total,
            },
        ));
    }

    fn emit_item_started(&self, phase: Phase, index: usize, source_id: &SourceId) {
        self.emit(ProgressEvent::new(
            phase,
            ProgressStage::ItemStarted {
                index,
                source_id: source_id.clone(),
            },
        ));
    }

    fn emit_item_completed(
        &self,
        phase: Phase,
        index: usize,
        source_id: &SourceId,
        outcome: &ItemOutcome,
    ) {
        self.emit(ProgressEvent::new(
            phase,
            ProgressStage::ItemCompleted {
                index,
                source_id: source_id.clone(),
                outcome: outcome.clone(),
            },
        ));
    }

    fn emit_phase_completed(&self, phase: Phase, report: &PhaseReport) {
        self.emit(ProgressEvent::new(
            phase,
            ProgressStage::PhaseCompleted {
                report: report.clone(),
            },
        ));
    }
}
