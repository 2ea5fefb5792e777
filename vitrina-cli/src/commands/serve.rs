//! `vitrina serve` - migrations, health server, background jobs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use vitrina_server::http::{run_server, ServerConfig};
use vitrina_server::jobs::{ArchiveSweep, HttpProbe, RecallScanner, TracingSink};
use vitrina_server::migrations;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Also run the archival sweep periodically, every N seconds
    #[arg(long, value_name = "SECS")]
    archive_every: Option<u64>,

    /// Skip running migrations at startup
    #[arg(long)]
    no_migrate: bool,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let (config, pool) = super::connect().await?;

    if !args.no_migrate {
        migrations::run(&pool).await.context("migrations failed")?;
    }

    // Recall scanner polls for due callbacks for as long as the server runs
    let scanner = RecallScanner::new(pool.clone(), Arc::new(TracingSink));
    let poll = config.recall_poll_interval;
    let scanner_task = tokio::spawn(async move { scanner.run(poll).await });

    // Optional periodic archival sweep
    let sweep_task = if let Some(secs) = args.archive_every {
        let probe = HttpProbe::new(
            config.archive_url_template.clone(),
            config.archive_concurrency,
            config.archive_timeout,
        )
        .context("failed to build listing probe")?;
        let sweep = ArchiveSweep::new(pool.clone(), Arc::new(probe));
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(secs.max(60)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = sweep.run_once().await {
                    tracing::error!(error = %e, "archival sweep failed");
                }
            }
        }))
    } else {
        None
    };

    let bind_addr: SocketAddr = format!("{}:{}", config.webapp_host, config.health_check_port)
        .parse()
        .context("invalid health server bind address")?;

    let result = run_server(pool, ServerConfig { bind_addr }).await;

    scanner_task.abort();
    if let Some(task) = sweep_task {
        task.abort();
    }

    result.context("health server failed")
}
