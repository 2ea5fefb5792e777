//! `vitrina update` - the bot's write path for a contract's progress fields.
//!
//! Only progress fields can be expressed here; deal fields belong to the
//! reconciler. The write stamps BOT provenance and drops the agent's cached
//! pages when `--agent` is given.

use anyhow::{Context, Result};
use clap::Parser;
use vitrina_core::ContractCache;
use vitrina_server::db::repos::PropertyRepo;
use vitrina_server::models::{CrmId, PropertyPatch};

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Contract to update
    #[arg(long)]
    pub crm_id: String,

    /// Invalidate this agent's cached contract pages after the write
    #[arg(long)]
    pub agent: Option<String>,

    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub collage: Option<bool>,
    #[arg(long)]
    pub prof_collage: Option<bool>,
    #[arg(long)]
    pub krisha: Option<String>,
    #[arg(long)]
    pub instagram: Option<String>,
    #[arg(long)]
    pub tiktok: Option<String>,
    #[arg(long)]
    pub shows: Option<i32>,
    #[arg(long)]
    pub analytics: Option<bool>,
    #[arg(long)]
    pub price_update: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}

pub async fn run(args: UpdateArgs) -> Result<()> {
    let (config, pool) = super::connect().await?;

    let crm_id = CrmId::new(&args.crm_id).map_err(|e| anyhow::anyhow!("{e}"))?;
    let patch = PropertyPatch {
        category: args.category,
        collage: args.collage,
        prof_collage: args.prof_collage,
        krisha: args.krisha,
        instagram: args.instagram,
        tiktok: args.tiktok,
        shows: args.shows,
        analytics: args.analytics,
        price_update: args.price_update,
        status: args.status,
        ..Default::default()
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to update: pass at least one progress field");
    }

    let updated = PropertyRepo::new(&pool)
        .update_progress(crm_id.as_str(), &patch)
        .await
        .context("update failed")?;

    if let Some(agent) = &args.agent {
        let cache = ContractCache::new(&config.cache_file);
        let dropped = cache
            .invalidate_prefix(&format!("{agent}:"))
            .context("cache invalidation failed")?;
        tracing::debug!(agent, dropped, "invalidated cached contract pages");
    }

    println!(
        "{} updated: status [{}], modified by {} at {}",
        updated.crm_id,
        updated.status,
        updated.last_modified_by,
        updated.last_modified_at.to_rfc3339()
    );
    Ok(())
}
