//! Agent directory repository.
//!
//! Keyed by normalized phone. `chat_ids` and `property_classes` are text[]
//! sets: containment queries with `@>`, appends that never introduce
//! duplicates.

use sqlx::{PgPool, Row};
use vitrina_core::normalize_phone;

use crate::models::{Agent, NewAgent, Paginated, Pagination};

use super::DbError;

const AGENT_COLUMNS: &str =
    "agent_phone, display_name, chat_ids, role, property_classes, created_at";

/// Agent directory repository
pub struct AgentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AgentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a directory entry (roster import is idempotent).
    /// The phone is normalized before it becomes the key.
    pub async fn upsert(&self, agent: &NewAgent) -> Result<Agent, DbError> {
        let phone = normalize_phone(&agent.agent_phone);
        let query = format!(
            "INSERT INTO vitrina_agents \
                 (agent_phone, display_name, chat_ids, role, property_classes) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (agent_phone) DO UPDATE SET \
                 display_name = EXCLUDED.display_name, \
                 chat_ids = EXCLUDED.chat_ids, \
                 role = EXCLUDED.role, \
                 property_classes = EXCLUDED.property_classes \
             RETURNING {AGENT_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, Agent>(&query)
            .bind(&phone)
            .bind(&agent.display_name)
            .bind(&agent.chat_ids)
            .bind(agent.role.as_str())
            .bind(&agent.property_classes)
            .fetch_one(self.pool)
            .await?)
    }

    /// Point lookup by phone in any input format.
    pub async fn get(&self, phone: &str) -> Result<Agent, DbError> {
        let normalized = normalize_phone(phone);
        let query = format!("SELECT {AGENT_COLUMNS} FROM vitrina_agents WHERE agent_phone = $1");

        sqlx::query_as::<_, Agent>(&query)
            .bind(&normalized)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "agent",
                id: normalized,
            })
    }

    /// Which agent owns a chat. Used to resolve an incoming message to a
    /// directory entry.
    pub async fn find_by_chat_id(&self, chat_id: &str) -> Result<Option<Agent>, DbError> {
        let query = format!(
            "SELECT {AGENT_COLUMNS} FROM vitrina_agents WHERE chat_ids @> $1 LIMIT 1"
        );
        Ok(sqlx::query_as::<_, Agent>(&query)
            .bind(vec![chat_id.to_owned()])
            .fetch_optional(self.pool)
            .await?)
    }

    /// Agents scoped to a listing class - the fan-out set for new-listing
    /// notifications.
    pub async fn list_for_class(&self, property_class: &str) -> Result<Vec<Agent>, DbError> {
        let query = format!(
            "SELECT {AGENT_COLUMNS} FROM vitrina_agents \
             WHERE property_classes @> $1 ORDER BY display_name"
        );
        Ok(sqlx::query_as::<_, Agent>(&query)
            .bind(vec![property_class.to_owned()])
            .fetch_all(self.pool)
            .await?)
    }

    /// Directory page, alphabetical.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<Agent>, DbError> {
        let query = format!(
            "SELECT {AGENT_COLUMNS}, COUNT(*) OVER() AS total \
             FROM vitrina_agents ORDER BY display_name LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&query)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(self.pool)
            .await?;

        use sqlx::FromRow;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Agent::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Attach a chat to an agent with set semantics: appending a chat that
    /// is already present is a no-op, not a duplicate.
    pub async fn add_chat_id(&self, phone: &str, chat_id: &str) -> Result<Agent, DbError> {
        let normalized = normalize_phone(phone);
        let query = format!(
            "UPDATE vitrina_agents \
             SET chat_ids = CASE \
                 WHEN chat_ids @> $2 THEN chat_ids \
                 ELSE array_append(chat_ids, $3) \
             END \
             WHERE agent_phone = $1 RETURNING {AGENT_COLUMNS}"
        );

        sqlx::query_as::<_, Agent>(&query)
            .bind(&normalized)
            .bind(vec![chat_id.to_owned()])
            .bind(chat_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "agent",
                id: normalized,
            })
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vitrina_agents")
            .fetch_one(self.pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    // DB-touching coverage for this repo lives in tests/store_integration.rs
    // (idempotent upsert, containment queries, set-semantics appends).
}
