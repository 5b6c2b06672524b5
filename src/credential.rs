//! Bearer credential lookup from page-scoped sources
//!
//! A `data-gl-auth` attribute lists where a token may live:
//!
//! ```text
//! data-gl-auth="local:token, session:token, query:access_token, Site.auth.token()"
//! ```
//!
//! Sources are tried left to right and the first non-empty string wins. The
//! environment (storage, page URL, global namespace) is injected through
//! [`CredentialEnvironment`] so lookups stay read-only and testable.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::{GalleonError, Result};
use crate::path;

const CALL_SUFFIX: &str = "()";
const BEARER_PREFIX: &str = "Bearer ";

/// Where a credential is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Local,
    Session,
    Query,
    Global,
}

impl FromStr for SourceKind {
    type Err = GalleonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "localstorage" => Ok(SourceKind::Local),
            "session" | "sessionstorage" => Ok(SourceKind::Session),
            "query" | "url" => Ok(SourceKind::Query),
            "global" => Ok(SourceKind::Global),
            other => Err(GalleonError::InvalidCredentialSource {
                descriptor: s.to_string(),
                reason: format!("unknown source type '{other}'"),
            }),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Local => "local",
            SourceKind::Session => "session",
            SourceKind::Query => "query",
            SourceKind::Global => "global",
        };
        f.write_str(name)
    }
}

/// One entry of a `data-gl-auth` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    pub kind: SourceKind,
    pub key: String,
    /// Global path written with a trailing `()`
    pub is_call: bool,
}

impl CredentialSource {
    /// Parse `[type:]key`; the type defaults to `global`
    pub fn parse(descriptor: &str) -> Result<Self> {
        let descriptor = descriptor.trim();
        let (kind, key) = match descriptor.split_once(':') {
            Some((kind, key)) => (kind.trim().parse()?, key.trim()),
            None => (SourceKind::Global, descriptor),
        };

        let (key, is_call) = match (kind, key.strip_suffix(CALL_SUFFIX)) {
            (SourceKind::Global, Some(stripped)) => (stripped.trim_end(), true),
            _ => (key, false),
        };

        if key.is_empty() {
            return Err(GalleonError::InvalidCredentialSource {
                descriptor: descriptor.to_string(),
                reason: "empty key".to_string(),
            });
        }

        Ok(Self {
            kind,
            key: key.to_string(),
            is_call,
        })
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)?;
        if self.is_call {
            f.write_str(CALL_SUFFIX)?;
        }
        Ok(())
    }
}

/// Parse a comma-separated source list, skipping invalid entries
pub fn parse_sources(list: &str) -> Vec<CredentialSource> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| match CredentialSource::parse(item) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(descriptor = item, error = %e, "Skipping credential source");
                None
            }
        })
        .collect()
}

/// Parse a `data-gl-auth` value
///
/// A blank list requests no credentials (`Some` of an empty list). A list
/// that names sources but yields no valid one is `None`: credentials were
/// asked for and can never be produced.
pub fn parse_auth_list(list: &str) -> Option<Vec<CredentialSource>> {
    let sources = parse_sources(list);
    let requested = list.split(',').any(|item| !item.trim().is_empty());
    if requested && sources.is_empty() {
        warn!(list, "No valid credential source in auth list");
        return None;
    }
    Some(sources)
}

/// Zero-argument function exposed in the global namespace
pub type GlobalFn = Arc<dyn Fn() -> std::result::Result<Value, String> + Send + Sync>;

/// A value found in the global namespace
#[derive(Clone)]
pub enum GlobalValue {
    Value(Value),
    Callable(GlobalFn),
}

impl fmt::Debug for GlobalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            GlobalValue::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Read-only view of the page environment credentials come from
pub trait CredentialEnvironment: Send + Sync {
    fn local_storage(&self, key: &str) -> Result<Option<String>>;

    fn session_storage(&self, key: &str) -> Result<Option<String>>;

    /// URL of the current page, if any
    fn page_url(&self) -> Option<Url>;

    /// Value at a dotted path of the global namespace
    fn global(&self, path: &str) -> Result<Option<GlobalValue>>;
}

/// Resolve the first usable credential as an `Authorization` header value
///
/// The token is used verbatim. Returns `None` when `sources` is empty
/// (without touching `env`) or when no source yields a non-empty string.
pub fn resolve_credential(
    sources: &[CredentialSource],
    env: &dyn CredentialEnvironment,
) -> Option<String> {
    for source in sources {
        match evaluate(source, env) {
            Ok(Some(token)) if !token.is_empty() => {
                debug!(source = %source, "Credential resolved");
                return Some(format!("{BEARER_PREFIX}{token}"));
            }
            Ok(Some(_)) => debug!(source = %source, "Credential source is empty"),
            Ok(None) => debug!(source = %source, "Credential source has no value"),
            Err(e) => warn!(source = %source, error = %e, "Credential source failed"),
        }
    }
    None
}

fn evaluate(source: &CredentialSource, env: &dyn CredentialEnvironment) -> Result<Option<String>> {
    match source.kind {
        SourceKind::Local => env.local_storage(&source.key),
        SourceKind::Session => env.session_storage(&source.key),
        SourceKind::Query => Ok(env.page_url().and_then(|url| {
            url.query_pairs()
                .find(|(name, _)| name == source.key.as_str())
                .map(|(_, value)| value.into_owned())
        })),
        SourceKind::Global => {
            let value = match env.global(&source.key)? {
                None => return Ok(None),
                // Bare callables are invoked too
                Some(GlobalValue::Callable(f)) => {
                    f().map_err(|reason| GalleonError::CredentialLookup {
                        source_key: source.key.clone(),
                        reason,
                    })?
                }
                Some(GlobalValue::Value(_)) if source.is_call => {
                    return Err(GalleonError::NotCallable {
                        path: source.key.clone(),
                    });
                }
                Some(GlobalValue::Value(v)) => v,
            };
            Ok(match value {
                Value::String(s) => Some(s),
                _ => None,
            })
        }
    }
}

/// In-memory environment for headless runs and tests
#[derive(Clone, Default)]
pub struct StaticEnvironment {
    local: HashMap<String, String>,
    session: HashMap<String, String>,
    page_url: Option<Url>,
    globals: Value,
    functions: HashMap<String, GlobalFn>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.local.insert(key.into(), value.into());
        self
    }

    pub fn with_session(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.session.insert(key.into(), value.into());
        self
    }

    pub fn with_page_url(mut self, url: Url) -> Self {
        self.page_url = Some(url);
        self
    }

    /// Set a global property, creating intermediate objects
    pub fn with_global(mut self, path: &str, value: Value) -> Self {
        let nested = path.rsplit('.').fold(value, |inner, part| {
            let mut map = Map::new();
            map.insert(part.to_string(), inner);
            Value::Object(map)
        });
        merge(&mut self.globals, nested);
        self
    }

    /// Register a function at a dotted global path
    pub fn with_function<F>(mut self, path: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(path.into(), Arc::new(f));
        self
    }
}

impl CredentialEnvironment for StaticEnvironment {
    fn local_storage(&self, key: &str) -> Result<Option<String>> {
        Ok(self.local.get(key).cloned())
    }

    fn session_storage(&self, key: &str) -> Result<Option<String>> {
        Ok(self.session.get(key).cloned())
    }

    fn page_url(&self) -> Option<Url> {
        self.page_url.clone()
    }

    fn global(&self, path: &str) -> Result<Option<GlobalValue>> {
        if let Some(f) = self.functions.get(path) {
            return Ok(Some(GlobalValue::Callable(Arc::clone(f))));
        }
        Ok(path::resolve(&self.globals, path)
            .cloned()
            .map(GlobalValue::Value))
    }
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                merge(existing.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every lookup; proves a source was or was not consulted
    struct FailingEnvironment {
        calls: AtomicUsize,
    }

    impl CredentialEnvironment for FailingEnvironment {
        fn local_storage(&self, key: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GalleonError::CredentialLookup {
                source_key: key.to_string(),
                reason: "storage disabled".to_string(),
            })
        }

        fn session_storage(&self, key: &str) -> Result<Option<String>> {
            self.local_storage(key)
        }

        fn page_url(&self) -> Option<Url> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }

        fn global(&self, path: &str) -> Result<Option<GlobalValue>> {
            self.local_storage(path).map(|_| None)
        }
    }

    #[test]
    fn parse_descriptor_forms() {
        assert_eq!(
            CredentialSource::parse("local:tok").unwrap(),
            CredentialSource {
                kind: SourceKind::Local,
                key: "tok".into(),
                is_call: false
            }
        );
        assert_eq!(
            CredentialSource::parse("sessionStorage: tok").unwrap().kind,
            SourceKind::Session
        );
        assert_eq!(CredentialSource::parse("url:t").unwrap().kind, SourceKind::Query);

        let global = CredentialSource::parse("Site.auth.token()").unwrap();
        assert_eq!(global.kind, SourceKind::Global);
        assert_eq!(global.key, "Site.auth.token");
        assert!(global.is_call);
    }

    #[test]
    fn parse_rejects_bad_descriptors() {
        assert!(CredentialSource::parse("cookie:tok").is_err());
        assert!(CredentialSource::parse("local:").is_err());
        assert!(CredentialSource::parse("global:()").is_err());
    }

    #[test]
    fn parse_list_skips_invalid_and_empty() {
        let sources = parse_sources("local:tok, , cookie:x,global:Site.token");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, SourceKind::Local);
        assert_eq!(sources[1].key, "Site.token");
    }

    #[test]
    fn first_non_empty_source_wins() {
        let env = StaticEnvironment::new()
            .with_local("tok", "")
            .with_global("Site.token", json!("xyz"))
            .with_session("later", "ignored");
        let sources = parse_sources("local:tok, global:Site.token, session:later");
        assert_eq!(resolve_credential(&sources, &env).as_deref(), Some("Bearer xyz"));
    }

    #[test]
    fn empty_list_performs_no_lookup() {
        let env = FailingEnvironment {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(resolve_credential(&[], &env), None);
        assert_eq!(env.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_sources_do_not_abort() {
        let env = FailingEnvironment {
            calls: AtomicUsize::new(0),
        };
        let sources = parse_sources("local:a, session:b, query:c, d");
        assert_eq!(resolve_credential(&sources, &env), None);
        assert_eq!(env.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn query_source_reads_page_url() {
        let env = StaticEnvironment::new()
            .with_page_url(Url::parse("https://site.test/page?x=1&access_token=abc%20def").unwrap());
        let sources = parse_sources("query:access_token");
        assert_eq!(
            resolve_credential(&sources, &env).as_deref(),
            Some("Bearer abc def")
        );
    }

    #[test]
    fn global_functions_are_invoked() {
        let env = StaticEnvironment::new()
            .with_function("Auth.current", || Ok(json!("fn-token")))
            .with_function("Auth.broken", || Err("boom".to_string()));

        let explicit = parse_sources("Auth.broken(), Auth.current()");
        assert_eq!(
            resolve_credential(&explicit, &env).as_deref(),
            Some("Bearer fn-token")
        );

        let legacy = parse_sources("global:Auth.current");
        assert_eq!(
            resolve_credential(&legacy, &env).as_deref(),
            Some("Bearer fn-token")
        );
    }

    #[test]
    fn call_suffix_on_plain_value_is_skipped() {
        let env = StaticEnvironment::new()
            .with_global("Site.token", json!("plain"))
            .with_local("fallback", "local-token");
        let sources = parse_sources("Site.token(), local:fallback");
        assert_eq!(
            resolve_credential(&sources, &env).as_deref(),
            Some("Bearer local-token")
        );
    }

    #[test]
    fn non_string_values_are_rejected() {
        let env = StaticEnvironment::new()
            .with_global("Site.count", json!(42))
            .with_global("Site.flag", json!(true))
            .with_function("Site.nothing", || Ok(Value::Null));
        let sources = parse_sources("Site.count, Site.flag, Site.nothing()");
        assert_eq!(resolve_credential(&sources, &env), None);
    }

    #[test]
    fn zero_string_is_accepted() {
        let env = StaticEnvironment::new().with_local("tok", "0");
        let sources = parse_sources("local:tok");
        assert_eq!(resolve_credential(&sources, &env).as_deref(), Some("Bearer 0"));
    }

    #[test]
    fn token_is_used_verbatim() {
        let env = StaticEnvironment::new()
            .with_local("empty", "")
            .with_local("tok", " padded ");
        let sources = parse_sources("local:empty, local:tok");
        assert_eq!(
            resolve_credential(&sources, &env).as_deref(),
            Some("Bearer  padded ")
        );

        let blank = StaticEnvironment::new().with_local("blank", "   ");
        assert_eq!(
            resolve_credential(&parse_sources("local:blank"), &blank).as_deref(),
            Some("Bearer    ")
        );
    }

    #[test]
    fn auth_list_with_only_invalid_sources_is_unusable() {
        assert_eq!(parse_auth_list("  "), Some(Vec::new()));
        assert_eq!(parse_auth_list(" , "), Some(Vec::new()));
        assert_eq!(parse_auth_list("cookie:token"), None);
        assert_eq!(parse_auth_list("cookie:token, local:tok").map(|s| s.len()), Some(1));
    }
}
