//! KQL files with comment metadata, plus the superficial checks applied to
//! query text and timespans before anything is sent to the workspace.
//!
//! ```text
//! // Metadata:
//! // Name: Rare parent process
//! // Description: Parents seen on fewer than 3 hosts
//! // Tactics: Execution, Defense Evasion
//! // Techniques: T1059, T1218
//! // Query:
//! DeviceProcessEvents
//! | summarize dcount(DeviceId) by InitiatingProcessFileName
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::SentinelApiError;
use super::models::QuerySpec;

pub const DEFAULT_TIMESPAN: &str = "P1D";

static METADATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//\s*(\w+):\s*(.*)").expect("valid metadata regex"));
static QUERY_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*").expect("valid query regex"));
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+S)?)?$").expect("valid duration regex")
});
static SHORT_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^P\d+[DWMY]$").expect("valid duration regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KqlDocument {
    pub name: String,
    pub description: String,
    pub extid: Option<String>,
    pub tactics: Vec<String>,
    pub techniques: Vec<String>,
    pub query: String,
}

#[derive(PartialEq)]
enum Section {
    Preamble,
    Metadata,
    Query,
}

/// Parses file content. `fallback_name` is used when no `Name:` entry exists.
pub fn parse_kql(content: &str, fallback_name: &str) -> KqlDocument {
    let mut doc = KqlDocument::default();
    let mut name = None;
    let mut query_lines = Vec::new();
    let mut section = Section::Preamble;

    for raw in content.split('\n') {
        let line = raw.trim_end_matches('\r');
        match line.trim() {
            "// Metadata:" => {
                section = Section::Metadata;
                continue;
            }
            "// Query:" => {
                section = Section::Query;
                continue;
            }
            _ => {}
        }

        match section {
            Section::Metadata => {
                let Some(caps) = METADATA_LINE.captures(line) else {
                    continue;
                };
                let value = caps[2].trim();
                match caps[1].to_lowercase().as_str() {
                    "name" => name = Some(value.to_string()),
                    "description" => doc.description = value.to_string(),
                    "extid" => doc.extid = Some(value.to_string()),
                    "tactics" => doc.tactics = split_list(value),
                    "techniques" => doc.techniques = split_list(value),
                    _ => {}
                }
            }
            Section::Query => query_lines.push(line),
            Section::Preamble => {}
        }
    }

    doc.name = name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_name.to_string());
    doc.query = query_lines.join("\n").trim().to_string();
    doc
}

pub fn parse_kql_file(path: impl AsRef<Path>) -> Result<KqlDocument, SentinelApiError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(parse_kql(&content, &stem))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl From<KqlDocument> for QuerySpec {
    fn from(doc: KqlDocument) -> Self {
        QuerySpec {
            display_name: doc.name,
            query: doc.query,
            description: doc.description,
            extid: doc.extid,
            tactics: doc.tactics,
            techniques: doc.techniques,
        }
    }
}

pub fn validate_query_text(query: &str) -> Result<(), SentinelApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SentinelApiError::ValidationError(
            "Query must be a non-empty string".to_string(),
        ));
    }
    if !QUERY_START.is_match(trimmed) {
        return Err(SentinelApiError::ValidationError(
            "Query appears to have invalid KQL syntax. Must start with a table name or data source."
                .to_string(),
        ));
    }
    Ok(())
}

pub fn validate_timespan(timespan: &str) -> Result<(), SentinelApiError> {
    if ISO_DURATION.is_match(timespan) || SHORT_DURATION.is_match(timespan) {
        Ok(())
    } else {
        Err(SentinelApiError::ValidationError(format!(
            "Invalid timespan '{}'. Use ISO 8601 duration format (e.g., P1D, PT1H, P7D)",
            timespan
        )))
    }
}
