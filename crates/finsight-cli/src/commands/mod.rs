//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `prompts` - Prompt library inspection (list, show, override path)
//! - `report` - Offline analysis of a CSV file
//! - `serve` - Web server command

pub mod prompts;
pub mod report;
pub mod serve;

// Re-export command functions for main.rs
pub use prompts::*;
pub use report::*;
pub use serve::*;
