//! vitrina-server: Postgres data layer for the vitrina CRM
//!
//! Owns the schema (three tables, the query-pattern index set), the typed
//! repositories the bot and batch jobs go through, the SHEET→DB deal
//! reconciliation component, the recall-notification scanner, the archival
//! sweep, and the health/status HTTP surface.

pub mod db;
pub mod http;
pub mod jobs;
pub mod models;
pub mod state;
pub mod sync;

pub use db::{create_pool, migrations};
pub use state::AppState;
