//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

pub async fn cmd_serve(host: &str, port: u16, static_dir: Option<&Path>) -> Result<()> {
    println!("🚀 Starting Finsight web server...");
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Parse allowed CORS origins from environment (comma-separated)
    let allowed_origins = parse_origins(&std::env::var("FINSIGHT_ALLOWED_ORIGINS").unwrap_or_default());
    if !allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (FINSIGHT_ALLOWED_ORIGINS)",
            allowed_origins.join(", ")
        );
    }

    if std::env::var("FINSIGHT_AI_API_KEY").is_err() {
        println!("   ℹ️  FINSIGHT_AI_API_KEY not set, advice will be rule-based");
    }
    if std::env::var("FINSIGHT_SESSION_SECRET").is_err() {
        println!("   ⚠️  FINSIGHT_SESSION_SECRET not set, sessions reset on restart");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let static_dir_str = match static_dir {
        Some(p) => Some(
            p.to_str()
                .context("Static directory path must be valid UTF-8")?,
        ),
        None => None,
    };

    let config = finsight_server::ServerConfig { allowed_origins };
    finsight_server::serve_with_config(host, port, static_dir_str, config).await?;

    Ok(())
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
