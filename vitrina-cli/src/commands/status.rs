//! `vitrina status` - operational stats.

use anyhow::Result;
use clap::Parser;
use vitrina_server::db::repos::{AgentRepo, ParsedPropertyRepo, PropertyRepo};

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Show per-mop deal counts
    #[arg(long)]
    pub by_mop: bool,
}

pub async fn run(args: StatusArgs) -> Result<()> {
    let (_config, pool) = super::connect().await?;

    let property_stats = PropertyRepo::new(&pool).stats().await?;
    let parsed_count = ParsedPropertyRepo::new(&pool).count().await?;
    let agent_count = AgentRepo::new(&pool).count().await?;

    println!("properties:        {}", property_stats.total);
    println!("parsed listings:   {}", parsed_count);
    println!("agents:            {}", agent_count);

    if args.by_mop {
        println!();
        for (mop, count) in &property_stats.by_mop {
            let name = if mop.is_empty() { "(unassigned)" } else { mop };
            println!("{count:>6}  {name}");
        }
    }
    Ok(())
}
