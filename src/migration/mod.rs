//! The migration pipeline
//!
//! Phases run strictly in declaration order. Within a phase, units of work
//! fan out under a `ConcurrencyLimiter` and fan back in before the next
//! phase starts, so every `IdentifierMap` write of phase N is visible to
//! phase N+1.

pub mod context;
pub mod creators;
pub mod identifier_map;
pub mod limiter;
pub mod linkers;
pub mod orchestrator;
pub mod phase;

pub use context::{RunContext, RunSettings};
pub use identifier_map::IdentifierMap;
pub use limiter::ConcurrencyLimiter;
pub use orchestrator::{MigrationOrchestrator, MigrationReport};
pub use phase::{ItemOutcome, Phase, PhaseReport, PhaseRunner};
