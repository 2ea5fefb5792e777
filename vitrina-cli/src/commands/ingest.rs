//! `vitrina ingest` - load scraped listings from an NDJSON file.
//!
//! One JSON object per line, `rbd_id` required. Rows whose `rbd_id` is
//! already stored are counted as duplicates and skipped; malformed lines
//! are reported but don't abort the batch.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use vitrina_server::db::repos::{IngestStats, ParsedPropertyRepo};
use vitrina_server::models::NewParsedProperty;

#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// NDJSON file with one listing per line
    pub file: PathBuf,

    /// Rows per insert transaction
    #[arg(long, default_value_t = 200)]
    pub batch_size: usize,
}

pub async fn run(args: IngestArgs, quiet: bool) -> Result<()> {
    let (_config, pool) = super::connect().await?;
    let repo = ParsedPropertyRepo::new(&pool);

    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let lines: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<_>>()
        .context("failed to read input")?;

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(lines.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .expect("static progress template"),
        );
        bar
    };

    let mut totals = IngestStats::default();
    let mut malformed = 0u64;
    let mut batch: Vec<NewParsedProperty> = Vec::with_capacity(args.batch_size);

    for (lineno, line) in lines.iter().enumerate() {
        bar.inc(1);
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<NewParsedProperty>(line) {
            Ok(row) => batch.push(row),
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "skipping malformed line");
                malformed += 1;
                continue;
            }
        }

        if batch.len() >= args.batch_size {
            let stats = repo
                .insert_batch(std::mem::take(&mut batch))
                .await
                .context("batch insert failed")?;
            totals.inserted += stats.inserted;
            totals.duplicates += stats.duplicates;
            bar.set_message(format!("{} inserted", totals.inserted));
        }
    }

    if !batch.is_empty() {
        let stats = repo
            .insert_batch(batch)
            .await
            .context("batch insert failed")?;
        totals.inserted += stats.inserted;
        totals.duplicates += stats.duplicates;
    }

    bar.finish_and_clear();

    println!(
        "ingested {}: {} inserted, {} duplicates, {} malformed",
        args.file.display(),
        totals.inserted,
        totals.duplicates,
        malformed
    );
    Ok(())
}
