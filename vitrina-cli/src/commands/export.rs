//! `vitrina export` - dump properties to CSV in the progress-sheet shape.
//!
//! Provenance columns (`last_modified_by`, `last_modified_at`, `created_at`)
//! are internal and omitted from the export.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use vitrina_server::db::repos::PropertyRepo;

/// Everything unless --since narrows the window.
const EXPORT_LIMIT: i64 = 100_000;

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Output CSV path
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Only rows modified after this instant (RFC 3339)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
}

pub async fn run(args: ExportArgs) -> Result<()> {
    let (_config, pool) = super::connect().await?;
    let repo = PropertyRepo::new(&pool);

    let since = args.since.unwrap_or(DateTime::UNIX_EPOCH);
    let rows = repo
        .modified_since(since, EXPORT_LIMIT)
        .await
        .context("export query failed")?;

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    writer.write_record([
        "crm_id",
        "date_signed",
        "contract_number",
        "mop",
        "rop",
        "dd",
        "client_name",
        "address",
        "complex",
        "contract_price",
        "expires",
        "category",
        "collage",
        "prof_collage",
        "krisha",
        "instagram",
        "tiktok",
        "mailing",
        "stream",
        "shows",
        "analytics",
        "price_update",
        "provide_analytics",
        "push_for_price",
        "status",
    ])?;

    let count = rows.len();
    for p in rows {
        writer.write_record([
            p.crm_id,
            p.date_signed.map(|d| d.to_string()).unwrap_or_default(),
            p.contract_number.unwrap_or_default(),
            p.mop.unwrap_or_default(),
            p.rop.unwrap_or_default(),
            p.dd.unwrap_or_default(),
            p.client_name.unwrap_or_default(),
            p.address.unwrap_or_default(),
            p.complex.unwrap_or_default(),
            p.contract_price.map(|v| v.to_string()).unwrap_or_default(),
            p.expires.map(|d| d.to_string()).unwrap_or_default(),
            p.category.unwrap_or_default(),
            p.collage.to_string(),
            p.prof_collage.to_string(),
            p.krisha.unwrap_or_default(),
            p.instagram.unwrap_or_default(),
            p.tiktok.unwrap_or_default(),
            p.mailing.unwrap_or_default(),
            p.stream.unwrap_or_default(),
            p.shows.to_string(),
            p.analytics.to_string(),
            p.price_update.unwrap_or_default(),
            p.provide_analytics.to_string(),
            p.push_for_price.to_string(),
            p.status,
        ])?;
    }
    writer.flush()?;

    println!("exported {} rows to {}", count, args.output.display());
    Ok(())
}
