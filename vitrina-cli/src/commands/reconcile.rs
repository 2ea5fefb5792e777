//! `vitrina reconcile` - apply a deal-snapshot CSV to the properties table.
//!
//! The CSV carries the upstream deal set with headers matching the deal
//! field names (`crm_id,date_signed,contract_number,mop,rop,dd,client_name,
//! address,complex,contract_price,expires`). Dates are `YYYY-MM-DD`; empty
//! cells become NULL.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use vitrina_server::models::DealRecord;
use vitrina_server::sync::{DealSnapshot, Reconciler};

#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    /// Snapshot CSV file
    pub file: PathBuf,
}

pub async fn run(args: ReconcileArgs) -> Result<()> {
    let (_config, pool) = super::connect().await?;

    let mut reader = csv::Reader::from_path(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    let mut records = Vec::new();
    for (lineno, result) in reader.deserialize::<DealRecord>().enumerate() {
        let record = result.with_context(|| format!("bad snapshot row at line {}", lineno + 2))?;
        if record.crm_id.trim().is_empty() {
            // Spreadsheet exports carry trailing blank rows
            continue;
        }
        records.push(record);
    }

    let reconciler = Reconciler::new(pool);
    let stats = reconciler
        .apply(&DealSnapshot::new(records))
        .await
        .context("reconciliation failed")?;

    println!(
        "reconciled {}: {} created, {} updated, {} retired, {} skipped by fuse",
        args.file.display(),
        stats.created,
        stats.updated,
        stats.retired,
        stats.skipped
    );
    Ok(())
}
