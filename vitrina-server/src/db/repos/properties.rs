//! CRM deal repository.
//!
//! All contract reads from the bot are scoped to the requesting agent: the
//! agent's surname and given name must both match one of the `mop`/`rop`/`dd`
//! columns case-insensitively. Progress updates stamp BOT provenance; deal
//! fields are only ever written by the reconciler (see `sync`).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::models::{AgentName, Paginated, Pagination, Property, PropertyPatch};
use crate::models::property::PatchValue;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("empty update: no fields to write")]
    EmptyUpdate,
}

/// Columns of `properties`, in table order. Kept in one place so every
/// SELECT/RETURNING stays aligned with the `Property` struct.
const PROPERTY_COLUMNS: &str = "crm_id, date_signed, contract_number, mop, rop, dd, client_name, \
     address, complex, contract_price, expires, category, collage, prof_collage, krisha, \
     instagram, tiktok, mailing, stream, shows, analytics, price_update, provide_analytics, \
     push_for_price, status, last_modified_by, last_modified_at, created_at";

/// The FIO scoping clause: surname and given name must both appear in the
/// same agent column. Binds: $1 = %surname%, $2 = %given name%.
const FIO_SCOPE: &str = "((LOWER(mop) LIKE $1 AND LOWER(mop) LIKE $2) \
     OR (LOWER(rop) LIKE $1 AND LOWER(rop) LIKE $2) \
     OR (LOWER(dd) LIKE $1 AND LOWER(dd) LIKE $2))";

/// Aggregate counters for the status surface
#[derive(Debug, Clone, serde::Serialize)]
pub struct PropertyStats {
    pub total: i64,
    pub by_mop: Vec<(String, i64)>,
}

/// CRM deal repository
pub struct PropertyRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PropertyRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Unscoped point lookup.
    pub async fn get(&self, crm_id: &str) -> Result<Property, DbError> {
        let query = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE crm_id = $1");
        sqlx::query_as::<_, Property>(&query)
            .bind(crm_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "property",
                id: crm_id.to_owned(),
            })
    }

    /// Point lookup scoped to the requesting agent. Returns NotFound both
    /// for unknown ids and for contracts that belong to someone else - the
    /// bot does not reveal which.
    pub async fn get_for_agent(
        &self,
        crm_id: &str,
        agent: &AgentName,
    ) -> Result<Property, DbError> {
        let (surname_like, name_like) = agent.like_patterns();
        let query = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE {FIO_SCOPE} AND crm_id = $3"
        );

        sqlx::query_as::<_, Property>(&query)
            .bind(&surname_like)
            .bind(&name_like)
            .bind(crm_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "property",
                id: crm_id.to_owned(),
            })
    }

    /// One page of the agent's contracts, newest activity first.
    pub async fn contracts_page(
        &self,
        agent: &AgentName,
        page: Pagination,
    ) -> Result<Paginated<Property>, DbError> {
        let (surname_like, name_like) = agent.like_patterns();
        let query = format!(
            "SELECT {PROPERTY_COLUMNS}, COUNT(*) OVER() AS total \
             FROM properties WHERE {FIO_SCOPE} \
             ORDER BY last_modified_at DESC LIMIT $3 OFFSET $4"
        );

        let rows = sqlx::query(&query)
            .bind(&surname_like)
            .bind(&name_like)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(self.pool)
            .await?;

        Self::paginate(rows, page)
    }

    /// Case-insensitive client-name substring search within the agent's
    /// contracts.
    pub async fn search_by_client(
        &self,
        client_name: &str,
        agent: &AgentName,
        page: Pagination,
    ) -> Result<Paginated<Property>, DbError> {
        let (surname_like, name_like) = agent.like_patterns();
        let client_like = format!("%{}%", client_name.to_lowercase());
        let query = format!(
            "SELECT {PROPERTY_COLUMNS}, COUNT(*) OVER() AS total \
             FROM properties WHERE {FIO_SCOPE} AND LOWER(client_name) LIKE $3 \
             ORDER BY last_modified_at DESC LIMIT $4 OFFSET $5"
        );

        let rows = sqlx::query(&query)
            .bind(&surname_like)
            .bind(&name_like)
            .bind(&client_like)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(self.pool)
            .await?;

        Self::paginate(rows, page)
    }

    /// Apply a progress-field patch, stamping BOT provenance.
    ///
    /// Column names come from `PropertyPatch::fields()` - static strings,
    /// never user input; values are bound.
    pub async fn update_progress(
        &self,
        crm_id: &str,
        patch: &PropertyPatch,
    ) -> Result<Property, DbError> {
        let fields = patch.fields();
        if fields.is_empty() {
            return Err(DbError::EmptyUpdate);
        }

        let set_clauses: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{col} = ${}", i + 1))
            .collect();
        let query = format!(
            "UPDATE properties SET {}, last_modified_by = 'BOT', last_modified_at = NOW() \
             WHERE crm_id = ${} RETURNING {PROPERTY_COLUMNS}",
            set_clauses.join(", "),
            fields.len() + 1,
        );

        let mut builder = sqlx::query_as::<_, Property>(&query);
        for (_, value) in &fields {
            builder = match value {
                PatchValue::Text(v) => builder.bind(v.clone()),
                PatchValue::Bool(v) => builder.bind(*v),
                PatchValue::Int(v) => builder.bind(*v),
            };
        }
        builder = builder.bind(crm_id);

        builder
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "property",
                id: crm_id.to_owned(),
            })
    }

    /// Rows touched since a given instant - the sheet-export path reads
    /// changes newest-first.
    pub async fn modified_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Property>, DbError> {
        let query = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties \
             WHERE last_modified_at > $1 ORDER BY last_modified_at DESC LIMIT $2"
        );
        Ok(sqlx::query_as::<_, Property>(&query)
            .bind(since)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Totals for the status surface: overall row count plus per-mop counts.
    pub async fn stats(&self) -> Result<PropertyStats, DbError> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM properties")
            .fetch_one(self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT COALESCE(mop, '') AS mop, COUNT(*) AS count \
             FROM properties GROUP BY mop ORDER BY count DESC",
        )
        .fetch_all(self.pool)
        .await?;

        let by_mop = rows
            .into_iter()
            .map(|r| (r.get::<String, _>("mop"), r.get::<i64, _>("count")))
            .collect();

        Ok(PropertyStats {
            total: total.0,
            by_mop,
        })
    }

    fn paginate(
        rows: Vec<sqlx::postgres::PgRow>,
        page: Pagination,
    ) -> Result<Paginated<Property>, DbError> {
        use sqlx::FromRow;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Property::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    // DB-touching coverage for this repo lives in tests/store_integration.rs
    // (case-insensitive FIO search, BOT provenance stamping). Run with:
    // DATABASE_URL=postgres://... cargo test -p vitrina-server -- --ignored
}
