//! Export trait and the per-kind collection registry

use crate::model::*;
use anyhow::Result;
use async_trait::async_trait;

/// A source export.
///
/// Collections are finite and restartable: every phase asks for its own
/// copy, so an implementation must be able to serve the same kind twice.
#[async_trait]
pub trait Export: Send + Sync {
    /// Called once before the first phase
    async fn prepare_for_import(&self) -> Result<()>;

    /// Called once after the last phase
    async fn cleanup_after_import(&self) -> Result<()>;

    async fn teams(&self) -> Result<Vec<Team>>;

    async fn projects(&self) -> Result<Vec<Project>>;

    async fn tags(&self) -> Result<Vec<Tag>>;

    /// Tasks, each carrying its stories
    async fn tasks(&self) -> Result<Vec<Task>>;

    async fn attachments(&self) -> Result<Vec<Attachment>>;

    async fn users(&self) -> Result<Vec<User>>;
}

/// A record type that has its own collection in the export.
///
/// The impls below are the complete `{kind, collection}` registry.
#[async_trait]
pub trait SourceRecord: Send + Sync + Sized + 'static {
    const KIND: EntityKind;

    fn source_id(&self) -> &SourceId;

    async fn load(export: &dyn Export) -> Result<Vec<Self>>;
}

macro_rules! source_record {
    ($ty:ty, $kind:expr, $accessor:ident) => {
        #[async_trait]
        impl SourceRecord for $ty {
            const KIND: EntityKind = $kind;

            fn source_id(&self) -> &SourceId {
                &self.source_id
            }

            async fn load(export: &dyn Export) -> Result<Vec<Self>> {
                export.$accessor().await
            }
        }
    };
}

source_record!(Team, EntityKind::Team, teams);
source_record!(Project, EntityKind::Project, projects);
source_record!(Tag, EntityKind::Tag, tags);
source_record!(Task, EntityKind::Task, tasks);
source_record!(Attachment, EntityKind::Attachment, attachments);
source_record!(User, EntityKind::User, users);
