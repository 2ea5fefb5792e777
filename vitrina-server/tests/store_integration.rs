//! Database integration tests.
//!
//! All tests require a dedicated PostgreSQL database and are gated behind
//! `--ignored`. Reconciliation is whole-table by design, so the suite runs
//! single-threaded:
//!
//!   DATABASE_URL=postgres://localhost/vitrina_test \
//!       cargo test -p vitrina-server -- --ignored --test-threads=1
//!
//! Each test cleans its own keys up front, so the suite can run repeatedly
//! against the same database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use vitrina_server::db::repos::{
    AgentRepo, ClaimOutcome, ParsedPropertyRepo, PropertyRepo,
};
use vitrina_server::db::{create_pool, migrations};
use vitrina_server::jobs::{RecallScanner, RecordingSink};
use vitrina_server::models::{
    AgentName, AgentRole, DealRecord, NewAgent, NewParsedProperty, ObjectStatus, Pagination,
};
use vitrina_server::sync::{DealSnapshot, Reconciler};

async fn setup() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = create_pool(&url).await.expect("pool creation failed");
    migrations::run(&pool).await.expect("migrations failed");
    pool
}

fn listing(rbd_id: i64) -> NewParsedProperty {
    serde_json::from_value(serde_json::json!({ "rbd_id": rbd_id })).unwrap()
}

fn listing_with_krisha(rbd_id: i64, krisha_id: &str, days_ago: i64) -> NewParsedProperty {
    let mut row = listing(rbd_id);
    row.krisha_id = Some(krisha_id.to_owned());
    row.krisha_date = Some(Utc::now() - Duration::days(days_ago));
    row
}

async fn clear_rbd_range(pool: &PgPool, from: i64, to: i64) {
    sqlx::query("DELETE FROM parsed_properties WHERE rbd_id >= $1 AND rbd_id < $2")
        .bind(from)
        .bind(to)
        .execute(pool)
        .await
        .expect("cleanup failed");
}

async fn clear_crm_prefix(pool: &PgPool, prefix: &str) {
    sqlx::query("DELETE FROM properties WHERE crm_id LIKE $1")
        .bind(format!("{prefix}%"))
        .execute(pool)
        .await
        .expect("cleanup failed");
}

async fn clear_agent(pool: &PgPool, phone: &str) {
    sqlx::query("DELETE FROM vitrina_agents WHERE agent_phone = $1")
        .bind(phone)
        .execute(pool)
        .await
        .expect("cleanup failed");
}

/// Insert a deal row directly. The reconciler is whole-table, so scoped
/// fixtures go in through plain SQL.
async fn insert_deal(pool: &PgPool, crm_id: &str, mop: &str, contract_number: &str, client: &str) {
    sqlx::query(
        "INSERT INTO properties (crm_id, mop, contract_number, client_name, contract_price) \
         VALUES ($1, $2, $3, $4, 42000000)",
    )
    .bind(crm_id)
    .bind(mop)
    .bind(contract_number)
    .bind(client)
    .execute(pool)
    .await
    .expect("fixture insert failed");
}

// --- parsed_properties: ingest and uniqueness -------------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn rbd_id_unique_and_duplicates_counted() {
    let pool = setup().await;
    clear_rbd_range(&pool, 9_100_000, 9_100_100).await;
    let repo = ParsedPropertyRepo::new(&pool);

    let first = repo
        .insert_batch(vec![listing(9_100_001), listing(9_100_002)])
        .await
        .unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.duplicates, 0);

    // Same natural keys again: no new rows, both accounted as duplicates.
    let second = repo
        .insert_batch(vec![listing(9_100_001), listing(9_100_002), listing(9_100_003)])
        .await
        .unwrap();
    assert_eq!(second.inserted, 1);
    assert_eq!(second.duplicates, 2);

    let existing = repo
        .existing_rbd_ids(&[9_100_001, 9_100_002, 9_100_003, 9_100_099])
        .await
        .unwrap();
    assert_eq!(existing.len(), 3);
    assert!(!existing.contains(&9_100_099));
}

// --- parsed_properties: latest-per-krisha resolution ------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn latest_unclaimed_picks_most_recent() {
    let pool = setup().await;
    clear_rbd_range(&pool, 9_101_000, 9_101_100).await;
    let repo = ParsedPropertyRepo::new(&pool);

    // Three parses of the same external listing over time
    repo.insert_batch(vec![
        listing_with_krisha(9_101_001, "k-latest-test", 30),
        listing_with_krisha(9_101_002, "k-latest-test", 10),
        listing_with_krisha(9_101_003, "k-latest-test", 20),
    ])
    .await
    .unwrap();

    let latest = repo
        .latest_unclaimed("k-latest-test")
        .await
        .unwrap()
        .expect("expected an unclaimed row");
    assert_eq!(latest.rbd_id, 9_101_002);

    // Claiming the newest row shifts resolution to the next-newest
    let outcome = repo
        .claim(latest.vitrina_id, "77011234567", Utc::now())
        .await
        .unwrap();
    assert!(matches!(outcome, ClaimOutcome::Claimed(_)));

    let next = repo
        .latest_unclaimed("k-latest-test")
        .await
        .unwrap()
        .expect("expected another unclaimed row");
    assert_eq!(next.rbd_id, 9_101_003);

    // The claimed row is still the latest parse overall
    let overall = repo
        .latest_by_krisha_id("k-latest-test")
        .await
        .unwrap()
        .expect("expected a row");
    assert_eq!(overall.rbd_id, 9_101_002);
    assert!(overall.is_claimed());
}

// --- parsed_properties: claim race ------------------------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn second_claim_loses() {
    let pool = setup().await;
    clear_rbd_range(&pool, 9_102_000, 9_102_100).await;
    let repo = ParsedPropertyRepo::new(&pool);

    repo.insert_batch(vec![listing(9_102_001)]).await.unwrap();
    let row = repo.existing_rbd_ids(&[9_102_001]).await.unwrap();
    assert!(row.contains(&9_102_001));

    let stored = sqlx::query_scalar::<_, i64>(
        "SELECT vitrina_id FROM parsed_properties WHERE rbd_id = $1",
    )
    .bind(9_102_001i64)
    .fetch_one(&pool)
    .await
    .unwrap();

    let won = repo.claim(stored, "77011111111", Utc::now()).await.unwrap();
    assert!(matches!(won, ClaimOutcome::Claimed(_)));

    let lost = repo.claim(stored, "77012222222", Utc::now()).await.unwrap();
    assert!(matches!(lost, ClaimOutcome::AlreadyClaimed));

    // The winner's assignment is intact
    let current = repo.get(stored).await.unwrap();
    assert_eq!(current.stats_agent_given.as_deref(), Some("77011111111"));
}

// --- recall predicate and scanner -------------------------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn recall_predicate_requires_all_three_legs() {
    let pool = setup().await;
    clear_rbd_range(&pool, 9_103_000, 9_103_100).await;
    let repo = ParsedPropertyRepo::new(&pool);

    repo.insert_batch(vec![
        listing(9_103_001),
        listing(9_103_002),
        listing(9_103_003),
    ])
    .await
    .unwrap();

    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT vitrina_id FROM parsed_properties WHERE rbd_id >= 9103001 AND rbd_id <= 9103003 \
         ORDER BY rbd_id",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let (eligible, unclaimed, wrong_status) = (ids[0], ids[1], ids[2]);

    let past = Utc::now() - Duration::minutes(5);

    // Fully eligible: claimed + call-back status + due recall time
    repo.claim(eligible, "77011234567", Utc::now()).await.unwrap();
    repo.schedule_recall(eligible, past).await.unwrap();

    // Recall armed but nobody claimed it
    repo.schedule_recall(unclaimed, past).await.unwrap();

    // Claimed with a recall time but the status moved on
    repo.claim(wrong_status, "77011234567", Utc::now()).await.unwrap();
    repo.schedule_recall(wrong_status, past).await.unwrap();
    repo.update_status(wrong_status, &ObjectStatus::new("Думает").unwrap(), None)
        .await
        .unwrap();

    let due = repo.due_recalls(Utc::now(), 100).await.unwrap();
    let due_ids: Vec<i64> = due.iter().map(|r| r.vitrina_id).collect();

    assert!(due_ids.contains(&eligible));
    assert!(!due_ids.contains(&unclaimed));
    assert!(!due_ids.contains(&wrong_status));
}

#[tokio::test]
#[ignore = "requires database"]
async fn recall_scan_delivers_once() {
    let pool = setup().await;
    clear_rbd_range(&pool, 9_104_000, 9_104_100).await;
    clear_agent(&pool, "77013334455").await;

    let repo = ParsedPropertyRepo::new(&pool);
    AgentRepo::new(&pool)
        .upsert(&NewAgent {
            agent_phone: "77013334455".into(),
            display_name: "Петрова Анна".into(),
            chat_ids: vec!["2001".into()],
            role: AgentRole::Mop,
            property_classes: vec![],
        })
        .await
        .unwrap();

    repo.insert_batch(vec![listing(9_104_001)]).await.unwrap();
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT vitrina_id FROM parsed_properties WHERE rbd_id = $1",
    )
    .bind(9_104_001i64)
    .fetch_one(&pool)
    .await
    .unwrap();

    repo.claim(id, "77013334455", Utc::now()).await.unwrap();
    repo.schedule_recall(id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    let sink = Arc::new(RecordingSink::new());
    let scanner = RecallScanner::new(pool.clone(), sink.clone());

    let first = scanner.run_once(Utc::now()).await.unwrap();
    assert_eq!(first.due, 1);
    assert_eq!(first.delivered, 1);

    let notices = sink.notices().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].agent_name, "Петрова Анна");
    assert_eq!(notices[0].chat_ids, vec!["2001".to_string()]);

    // The tombstone: a second pass finds nothing
    let second = scanner.run_once(Utc::now()).await.unwrap();
    assert_eq!(second.due, 0);
    assert_eq!(sink.notices().await.len(), 1);
}

// --- archival sweep exclusion -----------------------------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn archive_candidates_exclude_archived() {
    let pool = setup().await;
    clear_rbd_range(&pool, 9_105_000, 9_105_100).await;
    let repo = ParsedPropertyRepo::new(&pool);

    repo.insert_batch(vec![
        listing_with_krisha(9_105_001, "k-arch-active", 1),
        listing_with_krisha(9_105_002, "k-arch-dead", 1),
        listing(9_105_003), // no krisha_id, never a candidate
    ])
    .await
    .unwrap();

    let dead = sqlx::query_scalar::<_, i64>(
        "SELECT vitrina_id FROM parsed_properties WHERE rbd_id = $1",
    )
    .bind(9_105_002i64)
    .fetch_one(&pool)
    .await
    .unwrap();
    repo.mark_archived(dead).await.unwrap();

    let candidates = repo.archive_candidates(1000).await.unwrap();
    let krisha_ids: Vec<&str> = candidates
        .iter()
        .filter(|c| c.krisha_id.starts_with("k-arch-"))
        .map(|c| c.krisha_id.as_str())
        .collect();

    assert!(krisha_ids.contains(&"k-arch-active"));
    assert!(!krisha_ids.contains(&"k-arch-dead"));
}

// --- properties: case-insensitive FIO search and provenance -----------------

#[tokio::test]
#[ignore = "requires database"]
async fn fio_search_is_case_insensitive() {
    let pool = setup().await;
    clear_crm_prefix(&pool, "it-fio-").await;
    insert_deal(
        &pool,
        "it-fio-1",
        "Иванов Иван",
        "Д-100",
        "Сидоров Павел +77051112233",
    )
    .await;

    let repo = PropertyRepo::new(&pool);
    let lower = repo
        .contracts_page(&AgentName::new("Иванов Иван").unwrap(), Pagination::default())
        .await
        .unwrap();
    let upper = repo
        .contracts_page(&AgentName::new("ИВАНОВ ИВАН").unwrap(), Pagination::default())
        .await
        .unwrap();

    let lower_ids: Vec<&str> = lower.items.iter().map(|p| p.crm_id.as_str()).collect();
    let upper_ids: Vec<&str> = upper.items.iter().map(|p| p.crm_id.as_str()).collect();
    assert_eq!(lower_ids, upper_ids);
    assert!(lower_ids.contains(&"it-fio-1"));

    // Client search hits through the same scope
    let found = repo
        .search_by_client(
            "сидоров",
            &AgentName::new("Иванов Иван").unwrap(),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert!(found.items.iter().any(|p| p.crm_id == "it-fio-1"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn bot_update_stamps_provenance_and_keeps_deal_fields() {
    let pool = setup().await;
    clear_crm_prefix(&pool, "it-prov-").await;
    insert_deal(&pool, "it-prov-1", "Иванов Иван", "Д-200", "Клиент").await;

    let repo = PropertyRepo::new(&pool);
    // Column default attributes fresh rows to the sheet side
    let created = repo.get("it-prov-1").await.unwrap();
    assert_eq!(created.last_modified_by, "SHEET");

    let patch = vitrina_server::models::PropertyPatch {
        collage: Some(true),
        status: Some("Корректировка цены".into()),
        ..Default::default()
    };
    let updated = repo.update_progress("it-prov-1", &patch).await.unwrap();

    assert_eq!(updated.last_modified_by, "BOT");
    assert!(updated.collage);
    assert_eq!(updated.status, "Корректировка цены");
    // Deal fields untouched by the bot path
    assert_eq!(updated.contract_number.as_deref(), Some("Д-200"));
    assert_eq!(updated.contract_price, Some(42_000_000.0));
}

// --- reconciliation ----------------------------------------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn reconcile_creates_updates_and_soft_retires() {
    let pool = setup().await;
    // Reconciliation is whole-table: this test owns the properties table.
    sqlx::query("DELETE FROM properties")
        .execute(&pool)
        .await
        .expect("cleanup failed");
    let reconciler = Reconciler::new(pool.clone());
    let repo = PropertyRepo::new(&pool);

    let deal = |crm_id: &str, mop: &str| DealRecord {
        crm_id: crm_id.into(),
        date_signed: None,
        contract_number: None,
        mop: Some(mop.into()),
        rop: None,
        dd: None,
        client_name: None,
        address: None,
        complex: None,
        contract_price: None,
        expires: None,
    };

    // First pass: three new deals
    let first = reconciler
        .apply(&DealSnapshot::new(vec![
            deal("it-rec-1", "Иванов Иван"),
            deal("it-rec-2", "Иванов Иван"),
            deal("it-rec-3", "Иванов Иван"),
        ]))
        .await
        .unwrap();
    assert_eq!(first.created, 3);

    // The bot works one of them
    repo.update_progress(
        "it-rec-2",
        &vitrina_server::models::PropertyPatch {
            collage: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // Second pass: one deal renamed, one dropped (1 of 3 stays under the
    // retirement fuse).
    let second = reconciler
        .apply(&DealSnapshot::new(vec![
            deal("it-rec-1", "Петров Пётр"),
            deal("it-rec-2", "Иванов Иван"),
        ]))
        .await
        .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 2);

    // Deal field refreshed, progress survives, provenance attribution kept
    let renamed = repo.get("it-rec-1").await.unwrap();
    assert_eq!(renamed.mop.as_deref(), Some("Петров Пётр"));

    let worked = repo.get("it-rec-2").await.unwrap();
    assert!(worked.collage);
    assert_eq!(worked.last_modified_by, "BOT");

    // The dropped deal is soft-retired, not deleted
    let retired = repo.get("it-rec-3").await.unwrap();
    assert_eq!(retired.status, "Архив");
    assert_eq!(retired.last_modified_by, "SHEET");
}

#[tokio::test]
#[ignore = "requires database"]
async fn retirement_fuse_guards_truncated_snapshots() {
    let pool = setup().await;
    sqlx::query("DELETE FROM properties")
        .execute(&pool)
        .await
        .expect("cleanup failed");
    let reconciler = Reconciler::new(pool.clone());

    let deal = |crm_id: &str| DealRecord {
        crm_id: crm_id.into(),
        date_signed: None,
        contract_number: None,
        mop: None,
        rop: None,
        dd: None,
        client_name: None,
        address: None,
        complex: None,
        contract_price: None,
        expires: None,
    };

    reconciler
        .apply(&DealSnapshot::new(vec![
            deal("it-fuse-1"),
            deal("it-fuse-2"),
            deal("it-fuse-3"),
            deal("it-fuse-4"),
        ]))
        .await
        .unwrap();

    // A truncated read: only one of four deals came back. Retiring 3 of 4
    // would cross the 50% line, so nothing is retired.
    let stats = reconciler
        .apply(&DealSnapshot::new(vec![deal("it-fuse-1")]))
        .await
        .unwrap();
    assert_eq!(stats.retired, 0);
    assert_eq!(stats.skipped, 3);

    let repo = PropertyRepo::new(&pool);
    let untouched = repo.get("it-fuse-3").await.unwrap();
    assert_ne!(untouched.status, "Архив");
}

#[tokio::test]
#[ignore = "requires database"]
async fn reconcile_rejects_empty_snapshot() {
    let pool = setup().await;
    let reconciler = Reconciler::new(pool.clone());

    let err = reconciler.apply(&DealSnapshot::default()).await.unwrap_err();
    assert!(matches!(
        err,
        vitrina_server::sync::ReconcileError::EmptySnapshot
    ));
}

// --- agents ------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires database"]
async fn agent_upsert_and_containment() {
    let pool = setup().await;
    clear_agent(&pool, "77017778899").await;
    let repo = AgentRepo::new(&pool);

    let agent = repo
        .upsert(&NewAgent {
            agent_phone: "8 701 777 88 99".into(), // normalized on the way in
            display_name: "Ахметов Даурен".into(),
            chat_ids: vec!["3001".into()],
            role: AgentRole::Rop,
            property_classes: vec!["Бизнес".into(), "Комфорт".into()],
        })
        .await
        .unwrap();
    assert_eq!(agent.agent_phone, "77017778899");

    // Idempotent: same phone, refreshed fields
    let again = repo
        .upsert(&NewAgent {
            agent_phone: "77017778899".into(),
            display_name: "Ахметов Даурен".into(),
            chat_ids: vec!["3001".into()],
            role: AgentRole::Rop,
            property_classes: vec!["Бизнес".into()],
        })
        .await
        .unwrap();
    assert_eq!(again.property_classes, vec!["Бизнес".to_string()]);

    // Containment lookups
    let by_chat = repo.find_by_chat_id("3001").await.unwrap().unwrap();
    assert_eq!(by_chat.agent_phone, "77017778899");

    let scoped = repo.list_for_class("Бизнес").await.unwrap();
    assert!(scoped.iter().any(|a| a.agent_phone == "77017778899"));

    // Set-semantics append: no duplicates
    let appended = repo.add_chat_id("77017778899", "3002").await.unwrap();
    assert_eq!(appended.chat_ids.len(), 2);
    let appended_again = repo.add_chat_id("77017778899", "3002").await.unwrap();
    assert_eq!(appended_again.chat_ids.len(), 2);
}
