//! Error types with fix suggestions
//!
//! Failures that are expected during a binding pass (missing data, a bad
//! directive, a failed fetch) are contained where they happen and only show
//! up in the log and the [`EventLog`](crate::event_log::EventLog).
//! `GalleonError` covers what callers can actually observe.

use thiserror::Error;

use crate::dom::DomError;
use crate::fetch::FetchFailure;

/// Crate-wide result alias
pub type Result<T, E = GalleonError> = std::result::Result<T, E>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum GalleonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // ─────────────────────────────────────────────────────────────
    // Paths (GL-010 to GL-011)
    // ─────────────────────────────────────────────────────────────
    #[error("GL-010: Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("GL-011: Segment '{segment}' of '{path}' is not an identifier or name[index]")]
    InvalidSegment { path: String, segment: String },

    // ─────────────────────────────────────────────────────────────
    // Credentials (GL-020 to GL-022)
    // ─────────────────────────────────────────────────────────────
    #[error("GL-020: Invalid credential source '{descriptor}': {reason}")]
    InvalidCredentialSource { descriptor: String, reason: String },

    #[error("GL-021: Credential lookup '{source_key}' failed: {reason}")]
    CredentialLookup { source_key: String, reason: String },

    #[error("GL-022: '{path}' is not callable")]
    NotCallable { path: String },

    // ─────────────────────────────────────────────────────────────
    // Fetch (GL-030)
    // ─────────────────────────────────────────────────────────────
    #[error("GL-030: Fetching '{endpoint}' failed: {failure}")]
    Fetch {
        endpoint: String,
        failure: FetchFailure,
    },

    // ─────────────────────────────────────────────────────────────
    // Document + binding (GL-040 to GL-051)
    // ─────────────────────────────────────────────────────────────
    #[error("GL-040: Document error: {0}")]
    Dom(#[from] DomError),

    #[error("GL-050: Binding '{attribute}' failed: {reason}")]
    Binding { attribute: String, reason: String },

    #[error("GL-051: Template source '{path}' is unusable: {reason}")]
    TemplateSource { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration (GL-070 to GL-071)
    // ─────────────────────────────────────────────────────────────
    #[error("GL-070: Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("GL-071: Unknown log level '{level}'")]
    UnknownLogLevel { level: String },
}

impl FixSuggestion for GalleonError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            GalleonError::Io(_) => Some("Check file path and permissions"),
            GalleonError::Json(_) => Some("Ensure the input is valid JSON (try parsing with jq)"),
            GalleonError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            GalleonError::Url(_) => Some("Use an absolute URL or configure base_url"),
            GalleonError::HttpClient(_) => Some("Check TLS and proxy settings"),
            GalleonError::InvalidPath { .. } | GalleonError::InvalidSegment { .. } => {
                Some("Use paths like field.subfield or items[0].name")
            }
            GalleonError::InvalidCredentialSource { .. } => Some(
                "Use [type:]key with type one of local, session, query, url, global",
            ),
            GalleonError::CredentialLookup { .. } => {
                Some("Check that the credential source exists in the page environment")
            }
            GalleonError::NotCallable { .. } => Some("Drop the trailing () from the global path"),
            GalleonError::Fetch { .. } => {
                Some("Check the endpoint is reachable and returns application/json")
            }
            GalleonError::Dom(_) => None,
            GalleonError::Binding { .. } => {
                Some("Use a valid attribute name after the data-gl-bind- prefix")
            }
            GalleonError::TemplateSource { .. } => {
                Some("Point data-gl-iterate at an array or object in the data")
            }
            GalleonError::ConfigError { .. } => Some("Check ~/.config/galleon/config.toml"),
            GalleonError::UnknownLogLevel { .. } => {
                Some("Use one of NONE, ERROR, WARN, INFO, DEBUG")
            }
        }
    }
}
