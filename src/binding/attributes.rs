//! Attribute vocabulary derived from a single prefix

use super::directive::BindType;

pub const DEFAULT_PREFIX: &str = "data-gl";

/// Every attribute name the engine reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    /// Entry point endpoint: `data-gl-get`
    pub get: String,
    /// Credential sources: `data-gl-auth`
    pub auth: String,
    /// Iteration template path: `data-gl-iterate`
    pub iterate: String,
    /// Text binding and prefix of the other bindings: `data-gl-bind`
    pub bind: String,
    /// Composite source label written on clones: `data-gl-source`
    pub source: String,
    /// Instance index written on clones: `data-gl-index`
    pub index: String,
    /// Marks a consumed (hidden) template: `data-gl-template`
    pub template: String,
    /// Log level on a `<script>` element: `data-gl-log-level`
    pub log_level: String,
    bind_dash: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl AttributeNames {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches('-').to_ascii_lowercase();
        let name = |suffix: &str| format!("{prefix}-{suffix}");
        Self {
            get: name("get"),
            auth: name("auth"),
            iterate: name("iterate"),
            bind: name("bind"),
            source: name("source"),
            index: name("index"),
            template: name("template"),
            log_level: name("log-level"),
            bind_dash: name("bind-"),
        }
    }

    /// Attributes stripped from a clone of a template
    pub fn markers(&self) -> [&str; 3] {
        [&self.get, &self.auth, &self.iterate]
    }

    /// Binding type of `attribute`, `None` when it is not a binding attribute
    pub fn bind_type(&self, attribute: &str) -> Option<BindType> {
        let attribute = attribute.to_ascii_lowercase();
        if attribute == self.bind {
            return Some(BindType::Text);
        }
        let target = attribute.strip_prefix(&self.bind_dash)?;
        Some(match target {
            "html" => BindType::Html,
            "value" => BindType::Value,
            other => BindType::Attribute(other.to_string()),
        })
    }
}
