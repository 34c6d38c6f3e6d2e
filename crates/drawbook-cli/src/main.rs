//! drawbook CLI - Command-line interface for drawing pages
//!
//! Lists, edits and autosaves pages against the hosted record store, with a
//! local draft cache that survives restarts.

mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{open_context, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::draft::run_draft;
use crate::commands::folder::run_folder;
use crate::commands::page::run_page;
use crate::commands::search::run_search;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "drawbook=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Page { command } => {
            let ctx = open_context(&resolve_db_path(cli.db_path)?, profile)?;
            run_page(command, &ctx).await?;
        }
        Commands::Folder { command } => {
            let ctx = open_context(&resolve_db_path(cli.db_path)?, profile)?;
            run_folder(command, &ctx).await?;
        }
        Commands::Draft { command } => run_draft(command, &resolve_db_path(cli.db_path)?)?,
        Commands::Search { query, json } => {
            let ctx = open_context(&resolve_db_path(cli.db_path)?, profile)?;
            run_search(&ctx, &query, json).await?;
        }
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_LOG_DIRECTIVE.parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
