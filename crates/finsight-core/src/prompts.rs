//! Prompt library for the narrative client
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/finsight/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows users to customize prompts without modifying the source,
//! while automatically getting new default prompts on upgrade.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const ANALYZE_FINANCES: &str = include_str!("../prompts/analyze_finances.md");
    pub const CHAT_ADVISOR: &str = include_str!("../prompts/chat_advisor.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// One-shot advisory report for a snapshot
    AnalyzeFinances,
    /// Multi-turn advisor chat
    ChatAdvisor,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeFinances => "analyze_finances",
            Self::ChatAdvisor => "chat_advisor",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[Self::AnalyzeFinances, Self::ChatAdvisor]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::AnalyzeFinances => defaults::ANALYZE_FINANCES,
            Self::ChatAdvisor => defaults::CHAT_ADVISOR,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Metadata from frontmatter
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    /// Path to override file (if any)
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the whole prompt with template variables replaced
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render just the system section, or an empty string if there is none
    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        self.system_section()
            .map(|s| render_template(s, vars))
            .unwrap_or_default()
    }

    /// Render just the user section with variables
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    /// Override directory path
    override_dir: Option<PathBuf>,
    /// Cached parsed prompts
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        match self.cache.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let prompt = load_prompt(self.override_dir.as_deref(), id)?;
                Ok(entry.insert(prompt))
            }
        }
    }

    /// Check if a prompt has an override file
    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|dir| override_path(dir, id).exists())
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("finsight").join("prompts").join("overrides"))
}

fn override_path(dir: &Path, id: PromptId) -> PathBuf {
    dir.join(format!("{}.md", id.as_str()))
}

/// Load a prompt (checking override first, then default)
fn load_prompt(override_dir: Option<&Path>, id: PromptId) -> Result<Prompt> {
    if let Some(dir) = override_dir {
        let path = override_path(dir, id);
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let (metadata, body) = parse_prompt(&content)?;
            tracing::debug!(prompt = id.as_str(), path = %path.display(), "Using prompt override");
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
                override_path: Some(path),
            });
        }
    }

    let (metadata, body) = parse_prompt(id.default_content())?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
        override_path: None,
    })
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Up to the next top-level header or end of content
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

/// Replace `{{var}}` placeholders and resolve `{{#if var}}` blocks
fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let template = remove_unmatched_conditionals(template, vars);
    substitute_vars(&template, vars)
}

/// Replace `{{var}}` placeholders in a single pass
///
/// Substituted values are copied verbatim and never scanned again, so user
/// text containing `{{...}}` comes through unchanged. Unknown placeholders
/// are left in place.
fn substitute_vars(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            result.push_str(&rest[open..]);
            return result;
        };

        let name = &after_open[..close];
        match vars.get(name) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[open..open + close + 4]),
        }
        rest = &after_open[close + 2..];
    }

    result.push_str(rest);
    result
}

/// Keep `{{#if var}}...{{/if}}` blocks whose variable is non-empty, drop the rest
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_end) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = &result[var_start..var_start + var_end];
        let block_start = var_start + var_end + 2;

        let Some(endif_pos) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_content = &result[block_start..block_start + endif_pos];
        let full_end = block_start + endif_pos + 7;

        let should_include = vars.get(var_name).is_some_and(|v| !v.is_empty());

        result = if should_include {
            format!(
                "{}{}{}",
                &result[..if_start],
                block_content,
                &result[full_end..]
            )
        } else {
            format!("{}{}", &result[..if_start], &result[full_end..])
        };
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 1
---

# System
Test system prompt.

# User
Test user prompt with {{variable}}.
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 1);
        assert!(body.contains("# System"));
        assert!(body.contains("# User"));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# System\nNo frontmatter").is_err());
        assert!(parse_prompt("---\nid: x\nversion: 1\n# never closed").is_err());
    }

    #[test]
    fn test_extract_section() {
        let content = r#"# System
System content here.

# User
User content here."#;

        assert_eq!(
            extract_section(content, "# System"),
            Some("System content here.")
        );
        assert_eq!(
            extract_section(content, "# User"),
            Some("User content here.")
        );
        assert_eq!(extract_section(content, "# Missing"), None);
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Start{{#if category}}\nCategory: {{category}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("category", "Groceries");
        let result = remove_unmatched_conditionals(content, &vars);
        assert!(result.contains("Category: {{category}}"));

        let empty_vars: HashMap<&str, &str> = HashMap::new();
        let result = remove_unmatched_conditionals(content, &empty_vars);
        assert!(!result.contains("Category:"));
        assert!(result.contains("Start"));
        assert!(result.contains("End"));
    }

    #[test]
    fn test_render_user_and_system() {
        let mut lib = PromptLibrary::embedded_only();
        let prompt = lib.get(PromptId::ChatAdvisor).unwrap();

        let mut vars = HashMap::new();
        vars.insert("currency", "₹");
        vars.insert("question", "Should I buy a car?");
        vars.insert("key_expenses", "");

        let user = prompt.render_user(&vars);
        assert_eq!(user, "Should I buy a car?");

        let system = prompt.render_system(&vars);
        assert!(system.contains("Amounts are in ₹"));
        assert!(!system.contains("Key Expenses"));
    }

    #[test]
    fn test_substituted_text_is_not_rendered_again() {
        let mut vars = HashMap::new();
        vars.insert("income", "₹50,000.00");
        vars.insert("question", "Is {{income}} enough? {{#if income}}yes{{/if}} {{unknown}}");

        let rendered = render_template("Q: {{question}} ({{income}}) {{missing}}", &vars);
        assert_eq!(
            rendered,
            "Q: Is {{income}} enough? {{#if income}}yes{{/if}} {{unknown}} (₹50,000.00) {{missing}}"
        );

        assert_eq!(render_template("Unclosed {{income", &vars), "Unclosed {{income");
    }

    #[test]
    fn test_unreadable_override_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("chat_advisor.md")).unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        let err = lib.get(PromptId::ChatAdvisor).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_prompt_library_embedded() {
        let mut lib = PromptLibrary::embedded_only();

        for id in PromptId::all() {
            let prompt = lib.get(*id).unwrap();
            assert!(!prompt.is_override);
            assert!(prompt.override_path.is_none());
            assert!(prompt.system_section().is_some());
            assert!(prompt.user_section().is_some());
        }
        assert!(!lib.has_override(PromptId::AnalyzeFinances));
    }

    #[test]
    fn test_prompt_library_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("analyze_finances.md"),
            "---\nid: analyze_finances\nversion: 7\n---\n\n# System\nCustom.\n\n# User\nIncome is {{income}}.",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::AnalyzeFinances));
        assert!(!lib.has_override(PromptId::ChatAdvisor));

        let prompt = lib.get(PromptId::AnalyzeFinances).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 7);

        let mut vars = HashMap::new();
        vars.insert("income", "₹100");
        assert_eq!(prompt.render_user(&vars), "Income is ₹100.");
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let result = parse_prompt(id.default_content());
            assert!(
                result.is_ok(),
                "Failed to parse {}: {:?}",
                id.as_str(),
                result.err()
            );

            let (metadata, _) = result.unwrap();
            assert_eq!(
                metadata.id,
                id.as_str(),
                "Prompt ID mismatch for {}",
                id.as_str()
            );
        }
    }
}
