//! Template document parser.

use std::path::Path;

use super::types::TemplateDocument;
use crate::error::{Error, Result};

/// Parse a template document from a YAML (or JSON) string.
pub fn parse_template(source: &str) -> Result<TemplateDocument> {
    if source.trim().is_empty() {
        return Err(Error::Parse("Empty template document".to_string()));
    }

    serde_yaml::from_str(source).map_err(|e| {
        let msg = e.to_string();
        if let Some(field) = extract_missing_field(&msg) {
            Error::Parse(format!("Missing required field: {}", field))
        } else {
            Error::Parse(format!("Invalid template document: {}", msg))
        }
    })
}

/// Parse a template document from a file path.
pub fn parse_template_file(path: &Path) -> Result<TemplateDocument> {
    let content = std::fs::read_to_string(path)?;
    parse_template(&content)
}

fn extract_missing_field(error_message: &str) -> Option<&str> {
    let marker = "missing field `";
    let start = error_message.find(marker)? + marker.len();
    let rest = &error_message[start..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}
