//! Error taxonomy for a migration run
//!
//! Per-item errors (`ItemError`) are caught at the phase boundary and only
//! counted. `MigrationError` is structural and terminates the run.

use crate::migration::Phase;
use crate::model::{EntityKind, SourceId, TargetId};
use thiserror::Error;

/// Structural failures that abort the whole run
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(
        "{kind} {source_id} is already mapped to {existing}, refusing to map it to {attempted}"
    )]
    DuplicateKey {
        kind: EntityKind,
        source_id: SourceId,
        existing: TargetId,
        attempted: TargetId,
    },

    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {kind} records from export: {reason}")]
    Export { kind: EntityKind, reason: String },

    #[error("export {stage} hook failed: {reason}")]
    Lifecycle { stage: &'static str, reason: String },
}

/// Failure of a single unit of work inside a phase
#[derive(Debug, Error)]
pub enum ItemError {
    /// A creation precondition was not met. Not a failure.
    #[error("skipped {kind} {source_id}: {reason}")]
    Skipped {
        kind: EntityKind,
        source_id: SourceId,
        reason: String,
    },

    #[error("failed to create {kind} {source_id}{}: {reason}", parent_suffix(.target_parent))]
    CreationFailure {
        kind: EntityKind,
        source_id: SourceId,
        /// Already-created parent the item was to be created under
        target_parent: Option<TargetId>,
        reason: String,
    },

    #[error("failed to link {relationship} for {kind} {source_id} (target {target_parent}): {reason}")]
    LinkFailure {
        relationship: &'static str,
        kind: EntityKind,
        source_id: SourceId,
        target_parent: TargetId,
        reason: String,
    },

    #[error(transparent)]
    Fatal(#[from] MigrationError),
}

impl ItemError {
    pub fn skipped(kind: EntityKind, source_id: &SourceId, reason: impl Into<String>) -> Self {
        ItemError::Skipped {
            kind,
            source_id: source_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn creation(
        kind: EntityKind,
        source_id: &SourceId,
        target_parent: Option<&TargetId>,
        err: anyhow::Error,
    ) -> Self {
        ItemError::CreationFailure {
            kind,
            source_id: source_id.clone(),
            target_parent: target_parent.cloned(),
            reason: format!("{:#}", err),
        }
    }

    pub fn link(
        relationship: &'static str,
        kind: EntityKind,
        source_id: &SourceId,
        target_parent: &TargetId,
        reason: impl Into<String>,
    ) -> Self {
        ItemError::LinkFailure {
            relationship,
            kind,
            source_id: source_id.clone(),
            target_parent: target_parent.clone(),
            reason: reason.into(),
        }
    }
}

/// A terminated run: the fatal error plus how far the pipeline got
#[derive(Debug, Error)]
#[error("migration aborted during {failed_phase} (last completed phase: {}): {source}", last_completed_name(.last_completed_phase))]
pub struct RunFailure {
    pub failed_phase: PhaseLabel,
    pub last_completed_phase: Option<Phase>,
    #[source]
    pub source: MigrationError,
}

/// Where in the run a fatal error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseLabel {
    Prepare,
    Phase(Phase),
    Cleanup,
}

impl std::fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseLabel::Prepare => f.write_str("export preparation"),
            PhaseLabel::Phase(phase) => write!(f, "phase '{}'", phase.name()),
            PhaseLabel::Cleanup => f.write_str("export cleanup"),
        }
    }
}

fn parent_suffix(parent: &Option<TargetId>) -> String {
    parent
        .as_ref()
        .map(|p| format!(" (target parent {})", p))
        .unwrap_or_default()
}

fn last_completed_name(phase: &Option<Phase>) -> &'static str {
    phase.map(|p| p.name()).unwrap_or("none")
}
