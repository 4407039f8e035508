//! In-memory export for tests

use super::json::ExportDocument;
use super::traits::Export;
use crate::model::*;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves a fixed `ExportDocument` and counts lifecycle calls.
#[derive(Default)]
pub struct MockExport {
    pub document: ExportDocument,
    prepared: AtomicUsize,
    cleaned_up: AtomicUsize,
    /// Kinds requested, in request order
    requests: Mutex<Vec<EntityKind>>,
    failing_kind: Option<EntityKind>,
    failing_cleanup: bool,
}

impl MockExport {
    pub fn new(document: ExportDocument) -> Self {
        Self {
            document,
            ..Default::default()
        }
    }

    /// Make every request for this kind fail.
    pub fn failing_kind(mut self, kind: EntityKind) -> Self {
        self.failing_kind = Some(kind);
        self
    }

    /// Make `cleanup_after_import` fail (after counting the call).
    pub fn failing_cleanup(mut self) -> Self {
        self.failing_cleanup = true;
        self
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn cleaned_up_count(&self) -> usize {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<EntityKind> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn serve<T: Clone>(&self, kind: EntityKind, records: &[T]) -> Result<Vec<T>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(kind);
        }
        if self.failing_kind == Some(kind) {
            anyhow::bail!("{} collection unavailable", kind);
        }
        Ok(records.to_vec())
    }
}

#[async_trait]
impl Export for MockExport {
    async fn prepare_for_import(&self) -> Result<()> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup_after_import(&self) -> Result<()> {
        self.cleaned_up.fetch_add(1, Ordering::SeqCst);
        if self.failing_cleanup {
            anyhow::bail!("export cleanup refused");
        }
        Ok(())
    }

    async fn teams(&self) -> Result<Vec<Team>> {
        self.serve(EntityKind::Team, &self.document.teams)
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        self.serve(EntityKind::Project, &self.document.projects)
    }

    async fn tags(&self) -> Result<Vec<Tag>> {
        self.serve(EntityKind::Tag, &self.document.tags)
    }

    async fn tasks(&self) -> Result<Vec<Task>> {
        self.serve(EntityKind::Task, &self.document.tasks)
    }

    async fn attachments(&self) -> Result<Vec<Attachment>> {
        self.serve(EntityKind::Attachment, &self.document.attachments)
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.serve(EntityKind::User, &self.document.users)
    }
}
