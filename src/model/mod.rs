//! Data model for a migration run
//!
//! - `ids`: source/target identifier newtypes and the entity kinds
//! - `entities`: the source records read from an export
//! - `requests`: immutable create requests sent to the target workspace

pub mod entities;
pub mod ids;
pub mod requests;

pub use entities::*;
pub use ids::{EntityKind, SourceId, TargetId};
pub use requests::*;
