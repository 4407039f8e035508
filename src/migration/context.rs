//! State shared by every phase of one run

use super::identifier_map::IdentifierMap;
use super::limiter::DEFAULT_CONCURRENCY;
use crate::events::EventEmitter;
use crate::model::TargetId;
use crate::remote::RemoteApi;
use std::sync::Arc;

/// Validated settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Organization / workspace everything is created in
    pub workspace: TargetId,
    /// Ceiling on in-flight operations per phase
    pub concurrency: usize,
}

impl RunSettings {
    pub fn new(workspace: TargetId) -> Self {
        Self {
            workspace,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Everything a unit of work may touch, passed explicitly to each one.
///
/// The identifier map is the only state written concurrently.
pub struct RunContext {
    pub settings: RunSettings,
    pub ids: IdentifierMap,
    pub remote: Arc<dyn RemoteApi>,
    pub events: Option<Arc<dyn EventEmitter>>,
}

impl RunContext {
    pub fn new(settings: RunSettings, remote: Arc<dyn RemoteApi>) -> Self {
        Self {
            settings,
            ids: IdentifierMap::new(),
            remote,
            events: None,
        }
    }

    /// Report progress to the given sink
    pub fn with_events(mut self, events: Arc<dyn EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn workspace(&self) -> &TargetId {
        &self.settings.workspace
    }
}
