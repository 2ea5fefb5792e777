//! `vitrina agents` - directory management.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vitrina_core::AgentRoster;
use vitrina_server::db::repos::AgentRepo;
use vitrina_server::models::{AgentRole, NewAgent, Pagination};

#[derive(Parser, Debug)]
pub struct AgentsArgs {
    #[command(subcommand)]
    command: AgentsCommand,
}

#[derive(Subcommand, Debug)]
enum AgentsCommand {
    /// Sync the roster CSV into the vitrina_agents table (idempotent upsert)
    Import {
        /// Roster file; defaults to AGENTS_FILE from the environment
        #[arg(long)]
        file: Option<std::path::PathBuf>,

        /// Role assigned to imported agents (the roster carries no role column)
        #[arg(long, default_value = "MOP")]
        role: String,
    },
    /// List directory entries
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Attach a notification chat to an agent (set semantics, no duplicates)
    AddChat { phone: String, chat_id: String },
}

pub async fn run(args: AgentsArgs) -> Result<()> {
    let (config, pool) = super::connect().await?;
    let repo = AgentRepo::new(&pool);

    match args.command {
        AgentsCommand::Import { file, role } => {
            let role: AgentRole = role.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let path = file.unwrap_or(config.agents_file);
            let roster = AgentRoster::load(&path).context("failed to load roster")?;

            let mut imported = 0usize;
            for entry in roster.entries() {
                repo.upsert(&NewAgent {
                    agent_phone: entry.phone.clone(),
                    display_name: entry.name.clone(),
                    chat_ids: vec![],
                    role,
                    property_classes: vec![],
                })
                .await
                .with_context(|| format!("failed to upsert agent {}", entry.name))?;
                imported += 1;
            }
            println!("imported {} agents from {}", imported, path.display());
        }
        AgentsCommand::List { page } => {
            let result = repo.list(Pagination::new(page, 20)).await?;
            for agent in &result.items {
                println!(
                    "{}  {}  {}  chats: {}  classes: {}",
                    agent.agent_phone,
                    agent.display_name,
                    agent.role,
                    agent.chat_ids.len(),
                    agent.property_classes.join(",")
                );
            }
            println!(
                "page {}/{} ({} agents)",
                result.page,
                result.total_pages(),
                result.total
            );
        }
        AgentsCommand::AddChat { phone, chat_id } => {
            let agent = repo.add_chat_id(&phone, &chat_id).await?;
            println!(
                "{} now has {} chats",
                agent.display_name,
                agent.chat_ids.len()
            );
        }
    }
    Ok(())
}
