//! Prompts-related command implementations

use anyhow::{bail, Result};
use finsight_core::{PromptId, PromptLibrary};

/// List all available prompts and their override status
pub fn cmd_prompts_list(library: &PromptLibrary) -> Result<()> {
    println!("Available Prompts:\n");

    println!("{:<25} {}", "ID", "OVERRIDE");
    println!("{}", "-".repeat(40));

    for id in PromptId::all() {
        let override_status = if library.has_override(*id) {
            "✓ Custom"
        } else {
            "Default"
        };
        println!("{:<25} {}", id.as_str(), override_status);
    }

    println!();
    println!(
        "Override directory: {}",
        library
            .override_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    );

    println!();
    println!("To customize a prompt:");
    println!("  1. Save <id>.md in the override directory");
    println!("  2. Keep the frontmatter and the # System / # User sections");
    println!("  3. Restart the server to use the new prompt");

    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(library: &mut PromptLibrary, prompt_id: &str) -> Result<()> {
    let Some(id) = PromptId::all()
        .iter()
        .copied()
        .find(|id| id.as_str() == prompt_id)
    else {
        let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
        bail!(
            "Unknown prompt ID: {} (available: {})",
            prompt_id,
            known.join(", ")
        );
    };

    let prompt = library.get(id)?;

    println!("Prompt: {}", prompt.metadata.id);
    println!("Version: {}", prompt.metadata.version);
    println!(
        "Source: {}",
        if prompt.is_override {
            "Override"
        } else {
            "Default"
        }
    );

    if let Some(ref path) = prompt.override_path {
        println!("Override Path: {}", path.display());
    }

    println!();
    println!("--- Content ---");
    println!("{}", prompt.content);

    Ok(())
}

/// Show the path where prompt overrides should be placed
pub fn cmd_prompts_path(library: &PromptLibrary) -> Result<()> {
    match library.override_dir() {
        Some(path) => {
            println!("{}", path.display());

            if !path.exists() {
                eprintln!();
                eprintln!("Note: This directory does not exist yet.");
                eprintln!("Create it to start adding custom prompts.");
            }
        }
        None => {
            eprintln!("Could not determine prompts directory.");
            eprintln!("The data directory is not available on this system.");
        }
    }

    Ok(())
}
