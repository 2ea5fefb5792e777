//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Single-query lists with COUNT(*) OVER() totals (no N+1)
//! - Handles conflicts via ON CONFLICT (no check-then-insert)
//! - Conditional UPDATEs for claim races instead of SELECT-then-UPDATE

pub mod agents;
pub mod parsed;
pub mod properties;

pub use agents::AgentRepo;
pub use parsed::{ArchiveCandidate, ClaimOutcome, IngestStats, ParsedPropertyRepo};
pub use properties::{DbError, PropertyRepo, PropertyStats};
