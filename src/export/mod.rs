//! Source export access
//!
//! - `Export` trait: the collaborator the pipeline reads records from
//! - `SourceRecord`: per-kind registry binding each record type to its collection
//! - `JsonExport`: reads a JSON export document from disk
//! - `MockExport`: in-memory export for tests

pub mod json;
pub mod mock;
pub mod traits;

pub use json::{ExportDocument, JsonExport};
pub use mock::MockExport;
pub use traits::{Export, SourceRecord};
