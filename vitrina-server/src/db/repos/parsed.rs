//! Scraped-listing repository.
//!
//! Ingest is duplicate-aware (`ON CONFLICT (rbd_id) DO NOTHING`), claiming
//! is a conditional UPDATE so two agents racing for the same listing cannot
//! both win, and the recall/archival scans mirror the partial-index
//! predicates exactly.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::models::status::{STATUS_ARCHIVED, STATUS_RECALL};
use crate::models::{NewParsedProperty, ObjectStatus, ParsedProperty};

use super::DbError;

/// Columns of `parsed_properties`, in table order.
const PARSED_COLUMNS: &str = "vitrina_id, rbd_id, krisha_id, krisha_date, object_type, address, \
     complex, builder, flat_type, property_class, condition, sell_price, sell_price_per_m2, \
     address_type, house_num, floor_num, floor_count, room_count, phones, description, \
     ceiling_height, area, year_built, wall_type, stats_agent_given, stats_time_given, \
     stats_object_status, stats_recall_time, stats_description, created_at";

/// Outcome of a batch ingest
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct IngestStats {
    pub inserted: u64,
    pub duplicates: u64,
}

/// Outcome of a claim attempt. Losing the race is a normal outcome,
/// not an error.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Box<ParsedProperty>),
    AlreadyClaimed,
}

/// Row handed to the archival sweep
#[derive(Debug, Clone)]
pub struct ArchiveCandidate {
    pub vitrina_id: i64,
    pub krisha_id: String,
}

/// Scraped-listing repository
pub struct ParsedPropertyRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ParsedPropertyRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of scraped listings, skipping rows whose `rbd_id` is
    /// already present. Runs in one transaction; returns inserted vs
    /// duplicate counts (the ingest loop's stop condition).
    pub async fn insert_batch(
        &self,
        rows: Vec<NewParsedProperty>,
    ) -> Result<IngestStats, DbError> {
        let mut stats = IngestStats {
            inserted: 0,
            duplicates: rows.len() as u64,
        };
        if rows.is_empty() {
            return Ok(stats);
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            let row = row.normalized();
            let result = sqlx::query(
                r#"
                INSERT INTO parsed_properties (
                    rbd_id, krisha_id, krisha_date, object_type, address, complex,
                    builder, flat_type, property_class, condition, sell_price,
                    sell_price_per_m2, address_type, house_num, floor_num, floor_count,
                    room_count, phones, description, ceiling_height, area, year_built,
                    wall_type, stats_agent_given, stats_time_given, stats_object_status,
                    stats_recall_time, stats_description
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                        $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                        $27, $28)
                ON CONFLICT (rbd_id) DO NOTHING
                "#,
            )
            .bind(row.rbd_id)
            .bind(&row.krisha_id)
            .bind(row.krisha_date)
            .bind(&row.object_type)
            .bind(&row.address)
            .bind(&row.complex)
            .bind(&row.builder)
            .bind(&row.flat_type)
            .bind(&row.property_class)
            .bind(&row.condition)
            .bind(row.sell_price)
            .bind(row.sell_price_per_m2)
            .bind(&row.address_type)
            .bind(&row.house_num)
            .bind(row.floor_num)
            .bind(row.floor_count)
            .bind(row.room_count)
            .bind(&row.phones)
            .bind(&row.description)
            .bind(row.ceiling_height)
            .bind(row.area)
            .bind(row.year_built)
            .bind(&row.wall_type)
            .bind(&row.stats_agent_given)
            .bind(row.stats_time_given)
            .bind(&row.stats_object_status)
            .bind(row.stats_recall_time)
            .bind(&row.stats_description)
            .execute(&mut *tx)
            .await?;

            stats.inserted += result.rows_affected();
        }
        tx.commit().await?;

        stats.duplicates -= stats.inserted;
        Ok(stats)
    }

    /// Which of the given natural keys are already stored.
    pub async fn existing_rbd_ids(&self, ids: &[i64]) -> Result<HashSet<i64>, DbError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query("SELECT rbd_id FROM parsed_properties WHERE rbd_id = ANY($1)")
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get::<i64, _>("rbd_id")).collect())
    }

    pub async fn get(&self, vitrina_id: i64) -> Result<ParsedProperty, DbError> {
        let query = format!("SELECT {PARSED_COLUMNS} FROM parsed_properties WHERE vitrina_id = $1");
        sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(vitrina_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "parsed property",
                id: vitrina_id.to_string(),
            })
    }

    /// Most recent parse for an external listing id.
    pub async fn latest_by_krisha_id(
        &self,
        krisha_id: &str,
    ) -> Result<Option<ParsedProperty>, DbError> {
        let query = format!(
            "SELECT {PARSED_COLUMNS} FROM parsed_properties \
             WHERE krisha_id = $1 \
             ORDER BY krisha_date DESC NULLS LAST, vitrina_id DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(krisha_id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Most recent unclaimed parse for an external listing id: the
    /// "first match wins" dedup strategy - history rows stay untouched,
    /// work always lands on the newest free one.
    pub async fn latest_unclaimed(
        &self,
        krisha_id: &str,
    ) -> Result<Option<ParsedProperty>, DbError> {
        let query = format!(
            "SELECT {PARSED_COLUMNS} FROM parsed_properties \
             WHERE krisha_id = $1 AND stats_agent_given IS NULL \
             ORDER BY krisha_date DESC NULLS LAST, vitrina_id DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(krisha_id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Claim a listing for an agent. The WHERE clause is the whole race
    /// protection: only one concurrent claimer sees rows_affected = 1.
    pub async fn claim(
        &self,
        vitrina_id: i64,
        agent_phone: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, DbError> {
        let query = format!(
            "UPDATE parsed_properties \
             SET stats_agent_given = $2, stats_time_given = $3 \
             WHERE vitrina_id = $1 AND stats_agent_given IS NULL \
             RETURNING {PARSED_COLUMNS}"
        );

        let claimed = sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(vitrina_id)
            .bind(agent_phone)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;

        match claimed {
            Some(row) => Ok(ClaimOutcome::Claimed(Box::new(row))),
            // Distinguish "lost the race" from "no such row"
            None => match self.get(vitrina_id).await {
                Ok(_) => Ok(ClaimOutcome::AlreadyClaimed),
                Err(e) => Err(e),
            },
        }
    }

    /// Set the workflow status, optionally replacing the agent's note.
    pub async fn update_status(
        &self,
        vitrina_id: i64,
        status: &ObjectStatus,
        description: Option<&str>,
    ) -> Result<ParsedProperty, DbError> {
        let query = format!(
            "UPDATE parsed_properties \
             SET stats_object_status = $2, \
                 stats_description = COALESCE($3, stats_description) \
             WHERE vitrina_id = $1 RETURNING {PARSED_COLUMNS}"
        );
        sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(vitrina_id)
            .bind(status.as_str())
            .bind(description)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "parsed property",
                id: vitrina_id.to_string(),
            })
    }

    /// Arm a recall: status becomes "call back" with the given due time.
    pub async fn schedule_recall(
        &self,
        vitrina_id: i64,
        recall_time: DateTime<Utc>,
    ) -> Result<ParsedProperty, DbError> {
        let query = format!(
            "UPDATE parsed_properties \
             SET stats_object_status = '{STATUS_RECALL}', stats_recall_time = $2 \
             WHERE vitrina_id = $1 RETURNING {PARSED_COLUMNS}"
        );
        sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(vitrina_id)
            .bind(recall_time)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "parsed property",
                id: vitrina_id.to_string(),
            })
    }

    /// Due recalls, oldest first. Mirrors the recall partial index exactly:
    /// status "call back", a recall time, and an assigned agent are all
    /// required for eligibility.
    pub async fn due_recalls(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ParsedProperty>, DbError> {
        let query = format!(
            "SELECT {PARSED_COLUMNS} FROM parsed_properties \
             WHERE stats_object_status = '{STATUS_RECALL}' \
               AND stats_recall_time IS NOT NULL \
               AND stats_agent_given IS NOT NULL \
               AND stats_recall_time <= $1 \
             ORDER BY stats_recall_time ASC LIMIT $2"
        );
        Ok(sqlx::query_as::<_, ParsedProperty>(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Disarm a recall after delivery (or for an undeliverable row).
    /// Idempotent - clearing a cleared row is fine.
    pub async fn clear_recall(&self, vitrina_id: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE parsed_properties SET stats_recall_time = NULL WHERE vitrina_id = $1")
            .bind(vitrina_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Active krisha-bearing rows for the archival sweep. Already-archived
    /// rows never come back.
    pub async fn archive_candidates(&self, limit: i64) -> Result<Vec<ArchiveCandidate>, DbError> {
        let rows = sqlx::query(
            &format!(
                "SELECT vitrina_id, krisha_id FROM parsed_properties \
                 WHERE krisha_id IS NOT NULL AND krisha_id <> '' \
                   AND (stats_object_status IS NULL OR stats_object_status <> '{STATUS_ARCHIVED}') \
                 ORDER BY vitrina_id LIMIT $1"
            ),
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| ArchiveCandidate {
                vitrina_id: r.get("vitrina_id"),
                krisha_id: r.get("krisha_id"),
            })
            .collect())
    }

    /// Transition a row into the archived soft-state.
    pub async fn mark_archived(&self, vitrina_id: i64) -> Result<(), DbError> {
        sqlx::query(&format!(
            "UPDATE parsed_properties SET stats_object_status = '{STATUS_ARCHIVED}' \
             WHERE vitrina_id = $1"
        ))
        .bind(vitrina_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM parsed_properties")
            .fetch_one(self.pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    // DB-touching coverage for this repo lives in tests/store_integration.rs
    // (duplicate-aware ingest, claim races, the recall predicate, the
    // archival exclusion). Run with:
    // DATABASE_URL=postgres://... cargo test -p vitrina-server -- --ignored
}
