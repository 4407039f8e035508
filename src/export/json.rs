//! JSON file export
//!
//! The document holds one array per kind:
//!
//! ```json
//! {"teams": [...], "projects": [...], "tags": [...],
//!  "tasks": [...], "attachments": [...], "users": [...]}
//! ```
//!
//! Missing arrays are treated as empty.

use super::traits::Export;
use crate::model::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Every record of an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDocument {
    pub teams: Vec<Team>,
    pub projects: Vec<Project>,
    pub tags: Vec<Tag>,
    pub tasks: Vec<Task>,
    pub attachments: Vec<Attachment>,
    pub users: Vec<User>,
}

/// Export backed by a JSON file.
///
/// The file is parsed in `prepare_for_import` and released in
/// `cleanup_after_import`.
pub struct JsonExport {
    path: PathBuf,
    document: RwLock<Option<Arc<ExportDocument>>>,
}

impl JsonExport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            document: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn loaded(&self) -> Result<Arc<ExportDocument>> {
        self.document.read().await.clone().with_context(|| {
            format!(
                "Export {} read before prepare_for_import",
                self.path.display()
            )
        })
    }
}

#[async_trait]
impl Export for JsonExport {
    async fn prepare_for_import(&self) -> Result<()> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read export {}", self.path.display()))?;
        let document: ExportDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse export {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            teams = document.teams.len(),
            projects = document.projects.len(),
            tags = document.tags.len(),
            tasks = document.tasks.len(),
            attachments = document.attachments.len(),
            users = document.users.len(),
            "Loaded export"
        );

        *self.document.write().await = Some(Arc::new(document));
        Ok(())
    }

    async fn cleanup_after_import(&self) -> Result<()> {
        self.document.write().await.take();
        debug!(path = %self.path.display(), "Released export");
        Ok(())
    }

    async fn teams(&self) -> Result<Vec<Team>> {
        Ok(self.loaded().await?.teams.clone())
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        Ok(self.loaded().await?.projects.clone())
    }

    async fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.loaded().await?.tags.clone())
    }

    async fn tasks(&self) -> Result<Vec<Task>> {
        Ok(self.loaded().await?.tasks.clone())
    }

    async fn attachments(&self) -> Result<Vec<Attachment>> {
        Ok(self.loaded().await?.attachments.clone())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.loaded().await?.users.clone())
    }
}
