//! Merges the upstream deal set into `properties`.
//!
//! The upstream side (a spreadsheet fronting the CRM) is the source of truth
//! for deal fields; the bot owns the progress fields. This component is the
//! only writer of deal fields, and it never touches progress fields on an
//! existing row - the two write surfaces cannot collide.
//!
//! Rows that disappear upstream are soft-retired to the archived status,
//! never deleted. A fuse refuses to retire more than half the table in one
//! pass: an empty or truncated upstream read must not wipe state.

use std::collections::HashSet;

use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::models::status::STATUS_ARCHIVED;
use crate::models::DealRecord;

/// Full current deal set as read from the upstream source.
#[derive(Debug, Clone, Default)]
pub struct DealSnapshot {
    pub records: Vec<DealRecord>,
}

impl DealSnapshot {
    pub fn new(records: Vec<DealRecord>) -> Self {
        Self { records }
    }

    pub fn crm_ids(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.crm_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Outcome counters for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileStats {
    /// New rows inserted
    pub created: u64,
    /// Existing rows whose deal fields were refreshed
    pub updated: u64,
    /// Rows soft-retired to the archived status
    pub retired: u64,
    /// Rows the retirement fuse refused to touch
    pub skipped: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Another reconciliation is already running in this process
    #[error("reconciliation already in progress")]
    InProgress,

    /// Refusing to reconcile against an empty snapshot
    #[error("snapshot is empty; refusing to reconcile")]
    EmptySnapshot,

    /// A snapshot record failed validation
    #[error("invalid snapshot record: {reason}")]
    InvalidRecord { reason: String },

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// The reconciliation component
pub struct Reconciler {
    pool: PgPool,
    // Single-flight: overlapping runs would double-count and fight over
    // the retirement set.
    guard: Mutex<()>,
}

impl Reconciler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            guard: Mutex::new(()),
        }
    }

    /// Apply a snapshot. One transaction: either the whole deal set lands
    /// or none of it does.
    pub async fn apply(&self, snapshot: &DealSnapshot) -> Result<ReconcileStats, ReconcileError> {
        let _flight = self.guard.try_lock().map_err(|_| ReconcileError::InProgress)?;

        if snapshot.is_empty() {
            return Err(ReconcileError::EmptySnapshot);
        }
        for record in &snapshot.records {
            if record.crm_id.trim().is_empty() {
                return Err(ReconcileError::InvalidRecord {
                    reason: "record with empty crm_id".to_owned(),
                });
            }
        }

        let mut stats = ReconcileStats::default();
        let mut tx = self.pool.begin().await?;

        let existing: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT crm_id FROM properties",
        )
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        for record in &snapshot.records {
            let record = record.clone().with_default_expiry();
            if existing.contains(record.crm_id.as_str()) {
                self.refresh_deal_fields(&mut tx, &record).await?;
                stats.updated += 1;
            } else {
                self.insert_deal(&mut tx, &record).await?;
                stats.created += 1;
            }
        }

        // Soft-retire rows that vanished upstream, behind the fuse.
        let snapshot_ids = snapshot.crm_ids();
        let missing: Vec<String> = existing
            .iter()
            .filter(|id| !snapshot_ids.contains(id.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            if missing.len() * 2 > existing.len() {
                tracing::warn!(
                    missing = missing.len(),
                    existing = existing.len(),
                    "retirement fuse tripped: snapshot would retire more than half the table"
                );
                stats.skipped = missing.len() as u64;
            } else {
                let result = sqlx::query(&format!(
                    "UPDATE properties \
                     SET status = '{STATUS_ARCHIVED}', last_modified_by = 'SHEET', \
                         last_modified_at = NOW() \
                     WHERE crm_id = ANY($1) AND status <> '{STATUS_ARCHIVED}'"
                ))
                .bind(&missing)
                .execute(&mut *tx)
                .await?;
                stats.retired = result.rows_affected();
            }
        }

        tx.commit().await?;

        tracing::info!(
            created = stats.created,
            updated = stats.updated,
            retired = stats.retired,
            skipped = stats.skipped,
            "reconciliation complete"
        );
        Ok(stats)
    }

    /// Refresh the deal fields of an existing row. Progress fields and
    /// `last_modified_by` are deliberately absent from the SET list: BOT
    /// attribution survives routine deal refreshes.
    async fn refresh_deal_fields(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &DealRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE properties SET
                date_signed = $2,
                contract_number = $3,
                mop = $4,
                rop = $5,
                dd = $6,
                client_name = $7,
                address = $8,
                complex = $9,
                contract_price = $10,
                expires = $11,
                last_modified_at = NOW()
            WHERE crm_id = $1
            "#,
        )
        .bind(&record.crm_id)
        .bind(record.date_signed)
        .bind(&record.contract_number)
        .bind(&record.mop)
        .bind(&record.rop)
        .bind(&record.dd)
        .bind(&record.client_name)
        .bind(&record.address)
        .bind(&record.complex)
        .bind(record.contract_price)
        .bind(record.expires)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Insert a new deal. Progress fields take their column defaults;
    /// provenance starts at SHEET.
    async fn insert_deal(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &DealRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO properties (
                crm_id, date_signed, contract_number, mop, rop, dd, client_name,
                address, complex, contract_price, expires, last_modified_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'SHEET')
            "#,
        )
        .bind(&record.crm_id)
        .bind(record.date_signed)
        .bind(&record.contract_number)
        .bind(&record.mop)
        .bind(&record.rop)
        .bind(&record.dd)
        .bind(&record.client_name)
        .bind(&record.address)
        .bind(&record.complex)
        .bind(record.contract_price)
        .bind(record.expires)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(crm_id: &str) -> DealRecord {
        DealRecord {
            crm_id: crm_id.into(),
            date_signed: None,
            contract_number: None,
            mop: Some("Иванов Иван".into()),
            rop: None,
            dd: None,
            client_name: None,
            address: None,
            complex: None,
            contract_price: None,
            expires: None,
        }
    }

    #[test]
    fn snapshot_id_set() {
        let snapshot = DealSnapshot::new(vec![record("1"), record("2")]);
        let ids = snapshot.crm_ids();
        assert!(ids.contains("1"));
        assert!(ids.contains("2"));
        assert!(!ids.contains("3"));
    }

    #[test]
    fn empty_snapshot_detected() {
        assert!(DealSnapshot::default().is_empty());
        assert!(!DealSnapshot::new(vec![record("1")]).is_empty());
    }

    // Apply-path coverage (create/update/retire, the fuse, single-flight)
    // lives in tests/store_integration.rs behind the database gate.
}
