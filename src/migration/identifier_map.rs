//! Source id → target id mapping shared by every unit of work

use crate::error::MigrationError;
use crate::model::{EntityKind, SourceId, TargetId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Write-once mapping from source identifiers to target identifiers.
///
/// Keys are scoped by kind, since source ids are only unique within one.
/// Reads never await and see either a fully inserted value or nothing.
#[derive(Debug, Default)]
pub struct IdentifierMap {
    entries: DashMap<(EntityKind, SourceId), TargetId>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a mapping. A second write for the same key is a pipeline bug.
    pub fn put(
        &self,
        kind: EntityKind,
        source_id: &SourceId,
        target_id: TargetId,
    ) -> Result<(), MigrationError> {
        match self.entries.entry((kind, source_id.clone())) {
            Entry::Occupied(existing) => Err(MigrationError::DuplicateKey {
                kind,
                source_id: source_id.clone(),
                existing: existing.get().clone(),
                attempted: target_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(target_id);
                Ok(())
            }
        }
    }

    /// `None` when the entity was skipped, failed, or has not been created yet.
    pub fn get(&self, kind: EntityKind, source_id: &SourceId) -> Option<TargetId> {
        self.entries
            .get(&(kind, source_id.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Resolve a list of references, dropping the ones that are unmapped.
    /// Relative order of the resolved ids is preserved.
    pub fn resolve(&self, kind: EntityKind, source_ids: &[SourceId]) -> Vec<TargetId> {
        source_ids
            .iter()
            .filter_map(|id| self.get(kind, id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
