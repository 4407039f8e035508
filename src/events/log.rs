//! Progress sink that writes to the tracing log

use super::{EventEmitter, ProgressEvent, ProgressStage};
use crate::migration::ItemOutcome;
use tracing::debug;

/// Forwards progress events to `tracing`.
///
/// Everything goes out at `debug`: the phase runner already logs phase
/// boundaries at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
    fn emit(&self, event: ProgressEvent) {
        let phase = event.phase.name();
        match event.stage {
            ProgressStage::PhaseStarted { description, total } => {
                debug!(phase, total, "started {}", description);
            }
            ProgressStage::ItemStarted { index, source_id } => {
                debug!(phase, index, source_id = %source_id, "  > started");
            }
            ProgressStage::ItemCompleted {
                index,
                source_id,
                outcome,
            } => match outcome {
                ItemOutcome::Succeeded => {
                    debug!(phase, index, source_id = %source_id, "  < completed")
                }
                ItemOutcome::Skipped(reason) => {
                    debug!(phase, index, source_id = %source_id, reason = %reason, "  x skipped")
                }
                ItemOutcome::Failed(reason) => {
                    debug!(phase, index, source_id = %source_id, reason = %reason, "  ! failed")
                }
            },
            ProgressStage::PhaseCompleted { report } => {
                debug!(
                    phase,
                    attempted = report.attempted,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    skipped = report.skipped,
                    "completed {}",
                    event.phase.description()
                );
            }
        }
    }
}
