//! vitrina CLI - operate the real-estate CRM data layer
//!
//! This is the main entry point for the vitrina command-line tool, which
//! provides:
//! - The health/status server plus background jobs (`serve`)
//! - Scraped-listing ingest from NDJSON feeds (`ingest`)
//! - Deal-snapshot reconciliation from CSV (`reconcile`)
//! - Agent directory management (`agents` subcommands)
//! - The bot's contract query path (`contracts`)
//! - One-shot job passes for cron-style operation (`recall-scan`,
//!   `archive-sweep`)

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

mod commands;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "vitrina",
    author,
    version,
    about = "Data-layer tooling for the vitrina real-estate CRM",
    long_about = "Operate the vitrina CRM data layer: run the health server and \
                  background jobs, ingest scraped listings, reconcile deal snapshots, \
                  and manage the agent directory."
)]
struct Cli {
    /// Suppress progress bars (for cron/script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run migrations, the health/status server and the recall scanner
    Serve(commands::serve::ServeArgs),
    /// Load scraped listings from an NDJSON file into parsed_properties
    Ingest(commands::ingest::IngestArgs),
    /// Reconcile a deal-snapshot CSV into the properties table
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Export properties to CSV (progress-sheet format, meta columns omitted)
    Export(commands::export::ExportArgs),
    /// Agent directory operations (import, list, add-chat)
    Agents(commands::agents::AgentsArgs),
    /// Query an agent's contracts (cached pages)
    Contracts(commands::contracts::ContractsArgs),
    /// Update a contract's progress fields (the bot's write path)
    Update(commands::update::UpdateArgs),
    /// Run one recall-notification scan pass
    RecallScan(commands::jobs::RecallScanArgs),
    /// Run one archival sweep pass
    ArchiveSweep(commands::jobs::ArchiveSweepArgs),
    /// Print operational stats
    Status(commands::status::StatusArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Shell {
    Bash,
    Zsh,
    Fish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug })?;

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Ingest(args) => commands::ingest::run(args, cli.quiet).await,
        Commands::Reconcile(args) => commands::reconcile::run(args).await,
        Commands::Export(args) => commands::export::run(args).await,
        Commands::Agents(args) => commands::agents::run(args).await,
        Commands::Contracts(args) => commands::contracts::run(args).await,
        Commands::Update(args) => commands::update::run(args).await,
        Commands::RecallScan(args) => commands::jobs::recall_scan(args).await,
        Commands::ArchiveSweep(args) => commands::jobs::archive_sweep(args).await,
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Completions(args) => {
            let shell = match args.shell {
                Shell::Bash => clap_complete::Shell::Bash,
                Shell::Zsh => clap_complete::Shell::Zsh,
                Shell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "vitrina",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}
