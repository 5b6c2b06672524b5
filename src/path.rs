//! Path expressions over JSON values
//!
//! Supports:
//! - `a.b.c` (dot notation)
//! - `a[0].b` and `grid[1][0]` (array index)
//! - `items.0` (numeric key, read as an index on arrays)
//! - `$`, `$.a.b` and the empty path (the value itself)
//!
//! Resolution never fails loudly: a malformed path or missing data yields
//! `None`, which callers treat as "leave the target untouched".

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{GalleonError, Result};

/// `name`, `name[0]`, `name[0][1]` or `[0]`
static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").expect("valid segment regex"));
static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("valid index regex"));

/// A parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object field access: `.field`
    Property(String),
    /// Array index access: `[0]`
    Index(usize),
}

/// A parsed path: the ordered segments of `a.b[2].c`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathExpression {
    segments: Vec<Segment>,
}

impl PathExpression {
    /// Parse a path string into segments
    ///
    /// Examples:
    /// - `"price.currency"` → `[Property("price"), Property("currency")]`
    /// - `"items[0].name"` → `[Property("items"), Index(0), Property("name")]`
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let body = if let Some(stripped) = trimmed.strip_prefix("$.") {
            stripped
        } else if trimmed == "$" {
            return Ok(Self::default());
        } else {
            trimmed
        };

        if body.is_empty() {
            return Ok(Self::default());
        }

        let mut segments = Vec::new();
        for part in body.split('.') {
            if part.is_empty() {
                return Err(GalleonError::InvalidPath {
                    path: path.to_string(),
                    reason: "empty segment".to_string(),
                });
            }

            let caps = SEGMENT_RE
                .captures(part)
                .ok_or_else(|| GalleonError::InvalidSegment {
                    path: path.to_string(),
                    segment: part.to_string(),
                })?;

            let name = &caps[1];
            let indices = &caps[2];
            if name.is_empty() && indices.is_empty() {
                return Err(GalleonError::InvalidPath {
                    path: path.to_string(),
                    reason: "empty segment".to_string(),
                });
            }
            if !name.is_empty() {
                segments.push(Segment::Property(name.to_string()));
            }
            for index in INDEX_RE.captures_iter(indices) {
                let index = index[1]
                    .parse::<usize>()
                    .map_err(|e| GalleonError::InvalidPath {
                        path: path.to_string(),
                        reason: format!("index out of range: {e}"),
                    })?;
                segments.push(Segment::Index(index));
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True for the empty path (identity)
    pub fn is_identity(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk the segments from `root`, `None` on the first miss
    pub fn apply<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match segment {
                Segment::Property(name) => match current {
                    Value::Object(map) => map.get(name),
                    Value::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
                    _ => None,
                },
                Segment::Index(index) => current.as_array()?.get(*index),
            })
    }
}

/// Default cap on cached expressions
pub const MAX_CACHED_PATHS: usize = 1024;

/// Path resolver with a bounded cache of parsed expressions
///
/// Once the cache is full, new paths are parsed on every lookup and not stored.
pub struct PathResolver {
    cache: DashMap<String, Arc<PathExpression>>,
    limit: usize,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    pub fn new() -> Self {
        Self::with_limit(MAX_CACHED_PATHS)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            cache: DashMap::new(),
            limit,
        }
    }

    /// Parse `path`, reusing a cached expression when available
    pub fn expression(&self, path: &str) -> Result<Arc<PathExpression>> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(Arc::clone(&cached));
        }

        let expression = Arc::new(PathExpression::parse(path)?);
        // Concurrent inserts may overshoot the limit by a few entries
        if self.cache.len() < self.limit {
            self.cache.insert(path.to_string(), Arc::clone(&expression));
        }
        Ok(expression)
    }

    /// Resolve `path` against `root`; `None` stands for "undefined"
    pub fn resolve<'a>(&self, root: &'a Value, path: &str) -> Option<&'a Value> {
        let expression = match self.expression(path) {
            Ok(expression) => expression,
            Err(e) => {
                debug!(path, error = %e, "Unparseable path treated as undefined");
                return None;
            }
        };

        let value = expression.apply(root);
        debug!(path, found = value.is_some(), "Resolved path");
        value
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Global resolver instance
pub static PATH_RESOLVER: Lazy<PathResolver> = Lazy::new(PathResolver::new);

/// Resolve a path against a JSON value using the global resolver
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    PATH_RESOLVER.resolve(root, path)
}
