//! Error types for vmflow.
//!
//! Every variant carries a stable code so the editor frontend (and scripts
//! driving the CLI) can branch on the failure kind without parsing messages.

use serde_json::json;
use thiserror::Error;

/// Result type alias for vmflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// vmflow error types.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Entrypoint '{entrypoint}' not found in '{template}'")]
    EntrypointNotFound { template: String, entrypoint: String },

    #[error("{}", validation_summary(.0))]
    ValidationFailed(Vec<String>),

    #[error("Template catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Workflow submission failed: {0}")]
    ExecutorSubmissionFailed(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render aggregated validation messages as one bullet list.
fn validation_summary(messages: &[String]) -> String {
    format!("Validation failed:\n- {}", messages.join("\n- "))
}

impl Error {
    /// Get the machine-parseable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Error::EntrypointNotFound { .. } => "ENTRYPOINT_NOT_FOUND",
            Error::ValidationFailed(_) => "VALIDATION_FAILED",
            Error::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
            Error::ExecutorSubmissionFailed(_) => "EXECUTOR_SUBMISSION_FAILED",
            Error::InvalidGraph(_) => "INVALID_GRAPH",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// HTTP status to report for this error at the API boundary.
    ///
    /// Malformed graphs are the caller's fault; everything downstream of a
    /// well-formed graph (catalog, validation, executor) is reported as a
    /// server error.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidGraph(_) | Error::Parse(_) => 400,
            _ => 500,
        }
    }

    /// Get a message safe for external consumers.
    ///
    /// Catalog and executor failures keep the underlying message attached;
    /// local I/O and configuration details are hidden.
    pub fn external_message(&self) -> String {
        match self {
            Error::Io(_) => "An I/O error occurred".to_string(),
            Error::Config(_) => "A configuration error occurred".to_string(),
            Error::Http(e) => {
                if let Some(status) = e.status() {
                    format!("HTTP request failed with status {}", status.as_u16())
                } else if e.is_timeout() {
                    "HTTP request timed out".to_string()
                } else if e.is_connect() {
                    "Failed to connect to remote server".to_string()
                } else {
                    "HTTP request failed".to_string()
                }
            }
            other => other.to_string(),
        }
    }

    /// Convert to the `{ "error": ... }` payload returned by the API.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.external_message(),
            "code": self.code(),
        })
    }
}
