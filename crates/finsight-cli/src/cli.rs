//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Finsight - Personal finance health check and advisor
#[derive(Parser)]
#[command(name = "finsight")]
#[command(about = "Personal finance health scorer and AI advisor", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a Category,Amount CSV file
    Report {
        /// CSV file to analyze
        #[arg(short, long)]
        file: PathBuf,

        /// Label for the data (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Skip the AI narrative and use rule-based advice
        ///
        /// Without this flag the narrative backend is used when
        /// FINSIGHT_AI_API_KEY is set.
        #[arg(long)]
        no_ai: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (e.g., frontend/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage AI prompts (list available prompts, view override status)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g., analyze_finances)
        id: String,
    },

    /// Print the directory where prompt overrides are read from
    Path,
}
