//! Schema migrations for the vitrina tables
//!
//! Idempotent CREATE TABLE / CREATE INDEX statements, run at startup.
//! Existing data is never touched; every statement is IF NOT EXISTS.
//!
//! The index set is query-pattern-driven: each index below encodes one
//! access path the bot or a batch job actually takes (latest-listing
//! lookup, recall scan, archival sweep, case-insensitive FIO search).

use sqlx::PgPool;

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running vitrina migrations...");

    // CRM deals: read-only deal fields owned by the SHEET side, editable
    // marketing/progress fields owned by the BOT side, provenance columns
    // recording the last writer. Rows are never deleted; disappearance
    // upstream is soft-state via `status`.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            crm_id TEXT PRIMARY KEY,
            date_signed DATE,
            contract_number TEXT,
            mop TEXT,
            rop TEXT,
            dd TEXT,
            client_name TEXT,
            address TEXT,
            complex TEXT,
            contract_price DOUBLE PRECISION,
            expires DATE,
            category TEXT,
            collage BOOLEAN NOT NULL DEFAULT FALSE,
            prof_collage BOOLEAN NOT NULL DEFAULT FALSE,
            krisha TEXT,
            instagram TEXT,
            tiktok TEXT,
            mailing TEXT,
            stream TEXT,
            shows INTEGER NOT NULL DEFAULT 0,
            analytics BOOLEAN NOT NULL DEFAULT FALSE,
            price_update TEXT,
            provide_analytics BOOLEAN NOT NULL DEFAULT FALSE,
            push_for_price BOOLEAN NOT NULL DEFAULT FALSE,
            status TEXT NOT NULL DEFAULT 'Размещено',
            last_modified_by TEXT NOT NULL DEFAULT 'SHEET'
                CHECK (last_modified_by IN ('BOT', 'SHEET')),
            last_modified_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Scraped listings: one row per rbd listing, with the stats_* sub-model
    // tracking agent assignment and workflow state. Multiple rows may share
    // a krisha_id over time; krisha_date picks the latest.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parsed_properties (
            vitrina_id BIGSERIAL PRIMARY KEY,
            rbd_id BIGINT NOT NULL UNIQUE,
            krisha_id TEXT,
            krisha_date TIMESTAMPTZ,
            object_type TEXT,
            address TEXT,
            complex TEXT,
            builder TEXT,
            flat_type TEXT,
            property_class TEXT,
            condition TEXT,
            sell_price DOUBLE PRECISION,
            sell_price_per_m2 DOUBLE PRECISION,
            address_type TEXT,
            house_num TEXT,
            floor_num INTEGER,
            floor_count INTEGER,
            room_count INTEGER,
            phones TEXT,
            description TEXT,
            ceiling_height DOUBLE PRECISION,
            area DOUBLE PRECISION,
            year_built INTEGER,
            wall_type TEXT,
            stats_agent_given TEXT,
            stats_time_given TIMESTAMPTZ,
            stats_object_status TEXT,
            stats_recall_time TIMESTAMPTZ,
            stats_description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Agent directory: keyed by normalized phone; chat_ids and
    // property_classes are unordered string sets queried with @>.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vitrina_agents (
            agent_phone TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            chat_ids TEXT[] NOT NULL DEFAULT '{}',
            role TEXT NOT NULL CHECK (role IN ('MOP', 'ROP', 'DD')),
            property_classes TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    tracing::info!("vitrina migrations complete");
    Ok(())
}

async fn create_indexes(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Latest-listing point lookup by external id
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parsed_krisha_id ON parsed_properties(krisha_id) \
         WHERE krisha_id IS NOT NULL AND krisha_id <> ''",
    )
    .execute(pool)
    .await?;

    // Assignment / status filtering
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parsed_agent_given ON parsed_properties(stats_agent_given) \
         WHERE stats_agent_given IS NOT NULL",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parsed_object_status ON parsed_properties(stats_object_status) \
         WHERE stats_object_status IS NOT NULL",
    )
    .execute(pool)
    .await?;

    // Recall scan: the exact predicate the scheduled job uses. Only rows
    // with this status, a recall time and an assigned agent are eligible.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parsed_recall_due \
         ON parsed_properties(stats_recall_time, stats_agent_given) \
         WHERE stats_object_status = 'Перезвонить' \
           AND stats_recall_time IS NOT NULL \
           AND stats_agent_given IS NOT NULL",
    )
    .execute(pool)
    .await?;

    // Latest-per-krisha_id resolution, newest parse first
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parsed_krisha_latest \
         ON parsed_properties(krisha_id, krisha_date DESC) \
         WHERE krisha_id IS NOT NULL AND krisha_id <> ''",
    )
    .execute(pool)
    .await?;

    // Archival sweep: active krisha-bearing rows, already-archived excluded
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parsed_archive_scan \
         ON parsed_properties(vitrina_id) \
         WHERE krisha_id IS NOT NULL AND krisha_id <> '' \
           AND (stats_object_status IS NULL OR stats_object_status <> 'Архив')",
    )
    .execute(pool)
    .await?;

    // Case-insensitive agent/client search from the bot's query interface
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_props_lower_mop ON properties(LOWER(mop))")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_props_lower_rop ON properties(LOWER(rop))")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_props_lower_dd ON properties(LOWER(dd))")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_props_lower_client ON properties(LOWER(client_name))",
    )
    .execute(pool)
    .await?;

    // Contract pages are served newest-first
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_props_last_modified ON properties(last_modified_at DESC)",
    )
    .execute(pool)
    .await?;

    // Agent directory lookups
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_agents_role ON vitrina_agents(role)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_agents_chat_ids ON vitrina_agents USING GIN (chat_ids)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_agents_property_classes \
         ON vitrina_agents USING GIN (property_classes)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
