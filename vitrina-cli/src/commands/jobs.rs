//! One-shot job passes for cron-style operation.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use vitrina_server::db::repos::ParsedPropertyRepo;
use vitrina_server::jobs::{ArchiveSweep, HttpProbe, RecallScanner, TracingSink};

#[derive(Parser, Debug)]
pub struct RecallScanArgs {
    /// List due recalls without delivering or disarming them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn recall_scan(args: RecallScanArgs) -> Result<()> {
    let (config, pool) = super::connect().await?;

    if args.dry_run {
        let due = ParsedPropertyRepo::new(&pool)
            .due_recalls(Utc::now(), 100)
            .await?;
        for row in &due {
            println!(
                "#{}  krisha: {}  agent: {}  due: {}",
                row.vitrina_id,
                row.krisha_id.as_deref().unwrap_or("-"),
                row.stats_agent_given.as_deref().unwrap_or("-"),
                // Due times are stored UTC; show them in the deployment TZ
                row.stats_recall_time
                    .map(|t| t.with_timezone(&config.timezone).to_rfc3339())
                    .unwrap_or_default()
            );
        }
        println!("{} recalls due", due.len());
        return Ok(());
    }

    let scanner = RecallScanner::new(pool, Arc::new(TracingSink));
    let stats = scanner
        .run_once(Utc::now())
        .await
        .context("recall scan failed")?;
    println!(
        "recall scan: {} due, {} delivered, {} orphaned, {} failed",
        stats.due, stats.delivered, stats.orphaned, stats.failed
    );
    Ok(())
}

#[derive(Parser, Debug)]
pub struct ArchiveSweepArgs {
    /// Max rows to check in this pass
    #[arg(long, default_value_t = 500)]
    pub limit: i64,

    /// List candidates without probing or archiving
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn archive_sweep(args: ArchiveSweepArgs) -> Result<()> {
    let (config, pool) = super::connect().await?;

    if args.dry_run {
        let candidates = ParsedPropertyRepo::new(&pool)
            .archive_candidates(args.limit)
            .await?;
        for c in &candidates {
            println!("#{}  krisha: {}", c.vitrina_id, c.krisha_id);
        }
        println!("{} candidates", candidates.len());
        return Ok(());
    }

    let probe = HttpProbe::new(
        config.archive_url_template.clone(),
        config.archive_concurrency,
        config.archive_timeout,
    )
    .context("failed to build listing probe")?;

    let sweep = ArchiveSweep::new(pool, Arc::new(probe)).with_limit(args.limit);
    let stats = sweep.run_once().await.context("archival sweep failed")?;
    println!(
        "archival sweep: {} checked, {} archived",
        stats.checked, stats.archived
    );
    Ok(())
}
