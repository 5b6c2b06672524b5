//! Log verbosity and tracing setup
//!
//! Levels follow the page-facing names `NONE`, `ERROR`, `WARN`, `INFO` and
//! `DEBUG`. The effective level is picked, highest priority first, from the
//! CLI flag, `GALLEON_LOG_LEVEL`, a `<script data-gl-log-level>` element of
//! the document and the config file. `RUST_LOG` directives are honored on top.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::binding::AttributeNames;
use crate::dom::Document;
use crate::error::{GalleonError, Result};

pub const LOG_LEVEL_ENV: &str = "GALLEON_LOG_LEVEL";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    None,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl FromStr for LogLevel {
    type Err = GalleonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" | "OFF" => Ok(LogLevel::None),
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            _ => Err(GalleonError::UnknownLogLevel {
                level: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::None => "NONE",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        };
        f.write_str(name)
    }
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }

    /// Level from `GALLEON_LOG_LEVEL`, if set and non-empty
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(LOG_LEVEL_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }

    /// Level declared on the first `<script>` carrying the log-level attribute
    pub fn from_document<D: Document>(doc: &D, names: &AttributeNames) -> Result<Option<Self>> {
        let scripts = doc.descendants_where(doc.root(), |d, n| {
            d.tag_name(n).as_deref() == Some("script") && d.has_attribute(n, &names.log_level)
        });
        scripts
            .first()
            .and_then(|script| doc.attribute(*script, &names.log_level))
            .map(|level| level.parse())
            .transpose()
    }
}

/// First level that is set, highest priority first; `INFO` when none is
pub fn effective_level(candidates: &[Option<LogLevel>]) -> LogLevel {
    candidates.iter().flatten().copied().next().unwrap_or_default()
}

/// Install the global tracing subscriber
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.as_filter().into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
