//! TOML parser with helpful error messages

use super::schema::TargetConfigFile;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a target configuration file with detailed error messages
pub fn parse_target_toml(path: &Path) -> Result<TargetConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_target_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse target configuration content from string
pub fn parse_target_toml_str(content: &str) -> Result<TargetConfigFile> {
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Attach the offending line and its neighbours to a TOML error
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().trim().to_string();
    match error.span() {
        Some(span) => {
            let before = content.get(..span.start).unwrap_or(content);
            let line = before.matches('\n').count() + 1;
            anyhow::anyhow!(
                "TOML parsing error at line {line}: {message}\n{}",
                excerpt(content, line)
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {message}"),
    }
}

/// Up to five lines around `line` (1-based), the offending one marked.
fn excerpt(content: &str, line: usize) -> String {
    content
        .lines()
        .enumerate()
        .skip(line.saturating_sub(3))
        .take(5)
        .map(|(index, text)| {
            let number = index + 1;
            let marker = if number == line { ">>>" } else { "   " };
            format!("{marker} {number:4} | {text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
