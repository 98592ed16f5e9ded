//! Finsight CLI - Personal finance health check and advisor
//!
//! Usage:
//!   finsight report --file data.csv   Analyze a Category,Amount CSV
//!   finsight serve --port 3000        Start web server
//!   finsight prompts list             Show prompts and overrides

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use finsight_core::PromptLibrary;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Report {
            file,
            month,
            no_ai,
            json,
        } => commands::cmd_report(&file, month, no_ai, json).await,
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(&host, port, static_dir.as_deref()).await,
        Commands::Prompts { action } => {
            let mut library = PromptLibrary::new();
            match action {
                None | Some(PromptsAction::List) => commands::cmd_prompts_list(&library),
                Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&mut library, &id),
                Some(PromptsAction::Path) => commands::cmd_prompts_path(&library),
            }
        }
    }
}
