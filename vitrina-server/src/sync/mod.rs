//! Deal-snapshot reconciliation (SHEET → DB)

pub mod reconcile;

pub use reconcile::{DealSnapshot, ReconcileError, ReconcileStats, Reconciler};
