//! Easel CLI - Conflict analysis and resolution from the terminal

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::analytics::run_analytics;
use crate::commands::analyze::run_analyze;
use crate::commands::common::resolve_db_path;
use crate::commands::interventions::run_interventions;
use crate::commands::resolve::run_resolve;
use crate::commands::run::run_engine;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "easel=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Analyze { file, json } => run_analyze(&file, json)?,
        Commands::Resolve {
            file,
            workspace,
            json,
        } => run_resolve(&file, workspace, json, &db_path).await?,
        Commands::Run { workspace } => run_engine(workspace, &db_path).await?,
        Commands::Analytics {
            workspace,
            since,
            until,
            json,
        } => {
            run_analytics(
                workspace,
                since.as_deref(),
                until.as_deref(),
                json,
                &db_path,
            )
            .await?;
        }
        Commands::Interventions {
            status,
            limit,
            json,
        } => run_interventions(status, limit, json, &db_path).await?,
    }

    Ok(())
}
