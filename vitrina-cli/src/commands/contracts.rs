//! `vitrina contracts` - the bot's contract query path.
//!
//! Pages are cached in the cache file with a 30-minute TTL; `--no-cache`
//! bypasses it (and a bot-side update would invalidate the agent's keys).

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use vitrina_core::ContractCache;
use vitrina_server::db::repos::PropertyRepo;
use vitrina_server::models::{AgentName, CrmId, Pagination, Property};

#[derive(Parser, Debug)]
pub struct ContractsArgs {
    /// Agent display name (surname + given name)
    #[arg(long)]
    pub agent: String,

    /// Look up a single contract by CRM id instead of listing a page
    #[arg(long)]
    pub crm_id: Option<String>,

    /// Page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Filter by client-name substring (case-insensitive)
    #[arg(long)]
    pub client: Option<String>,

    /// Bypass the page cache
    #[arg(long)]
    pub no_cache: bool,
}

/// What a cached page remembers about a contract
#[derive(Debug, Serialize, Deserialize)]
struct ContractLine {
    crm_id: String,
    client_name: Option<String>,
    address: Option<String>,
    status: String,
    last_modified_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedPage {
    lines: Vec<ContractLine>,
    total: i64,
    page: u32,
}

impl From<&Property> for ContractLine {
    fn from(p: &Property) -> Self {
        Self {
            crm_id: p.crm_id.clone(),
            client_name: p.client_name.clone(),
            address: p.address.clone(),
            status: p.status.clone(),
            last_modified_at: p.last_modified_at.to_rfc3339(),
        }
    }
}

pub async fn run(args: ContractsArgs) -> Result<()> {
    let (config, pool) = super::connect().await?;

    let agent = AgentName::new(&args.agent).map_err(|e| anyhow::anyhow!("{e}"))?;

    // Point lookup: always live, scoped to the agent
    if let Some(raw) = &args.crm_id {
        let crm_id = CrmId::new(raw).map_err(|e| anyhow::anyhow!("{e}"))?;
        let contract = PropertyRepo::new(&pool)
            .get_for_agent(crm_id.as_str(), &agent)
            .await
            .context("contract lookup failed")?;
        println!(
            "{}  {}  {}  [{}]  modified by {} at {}",
            contract.crm_id,
            contract.client_name.as_deref().unwrap_or("-"),
            contract.address.as_deref().unwrap_or("-"),
            contract.status,
            contract.last_modified_by,
            contract.last_modified_at.to_rfc3339()
        );
        return Ok(());
    }

    let cache = ContractCache::new(&config.cache_file);
    let cache_key = format!(
        "{}:{}:{}",
        agent.as_str(),
        args.client.as_deref().unwrap_or(""),
        args.page
    );

    if !args.no_cache {
        if let Some(value) = cache.get(&cache_key).context("cache read failed")? {
            if let Ok(page) = serde_json::from_value::<CachedPage>(value) {
                tracing::debug!(key = %cache_key, "serving contracts page from cache");
                print_page(&page);
                return Ok(());
            }
        }
    }

    let repo = PropertyRepo::new(&pool);
    let pagination = Pagination::new(args.page, config.contracts_per_page);
    let result = match &args.client {
        Some(client) => repo.search_by_client(client, &agent, pagination).await?,
        None => repo.contracts_page(&agent, pagination).await?,
    };

    let page = CachedPage {
        lines: result.items.iter().map(ContractLine::from).collect(),
        total: result.total,
        page: result.page,
    };

    if !args.no_cache {
        cache
            .set(&cache_key, serde_json::to_value(&page)?)
            .context("cache write failed")?;
    }

    print_page(&page);
    Ok(())
}

fn print_page(page: &CachedPage) {
    for line in &page.lines {
        println!(
            "{}  {}  {}  [{}]",
            line.crm_id,
            line.client_name.as_deref().unwrap_or("-"),
            line.address.as_deref().unwrap_or("-"),
            line.status
        );
    }
    println!("page {} ({} contracts total)", page.page, page.total);
}
