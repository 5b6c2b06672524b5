//! Event log for binding runs
//!
//! Records what a run actually did so callers can inspect failures without
//! scraping logs.
//! - Event: envelope with id + timestamp + kind
//! - EventKind: run, entry point and fine-grained (template/directive) levels
//! - EventLog: thread-safe, append-only log

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetch::FetchFailure;

/// Single event in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // RUN LEVEL
    // ═══════════════════════════════════════════
    RunStarted {
        entry_count: usize,
    },
    RunCompleted {
        bound: usize,
        failed: usize,
        duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // ENTRY POINT LEVEL
    // ═══════════════════════════════════════════
    EntryStarted {
        endpoint: Arc<str>,
    },
    EntryBound {
        endpoint: Arc<str>,
        duration_ms: u64,
    },
    EntryFailed {
        endpoint: Arc<str>,
        failure: FetchFailure,
    },
    EntrySkipped {
        endpoint: Arc<str>,
        reason: String,
    },

    // ═══════════════════════════════════════════
    // FINE-GRAINED (template/directive)
    // ═══════════════════════════════════════════
    TemplateExpanded {
        source: String,
        instances: usize,
    },
    TemplateSkipped {
        path: String,
        reason: String,
    },
    DirectiveFailed {
        attribute: String,
        path: String,
        error: String,
    },
}

impl EventKind {
    /// Endpoint if the event belongs to an entry point
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::EntryStarted { endpoint }
            | Self::EntryBound { endpoint, .. }
            | Self::EntryFailed { endpoint, .. }
            | Self::EntrySkipped { endpoint, .. } => Some(endpoint),
            Self::RunStarted { .. }
            | Self::RunCompleted { .. }
            | Self::TemplateExpanded { .. }
            | Self::TemplateSkipped { .. }
            | Self::DirectiveFailed { .. } => None,
        }
    }

    pub fn is_run_event(&self) -> bool {
        matches!(self, Self::RunStarted { .. } | Self::RunCompleted { .. })
    }

    /// Failures and skips, the events worth surfacing to a user
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Self::EntryFailed { .. }
                | Self::EntrySkipped { .. }
                | Self::TemplateSkipped { .. }
                | Self::DirectiveFailed { .. }
        )
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn filter_endpoint(&self, endpoint: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.endpoint() == Some(endpoint))
            .collect()
    }

    pub fn problems(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.is_problem())
            .collect()
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_extraction() {
        let started = EventKind::EntryStarted {
            endpoint: "/api/a".into(),
        };
        assert_eq!(started.endpoint(), Some("/api/a"));
        assert_eq!(EventKind::RunStarted { entry_count: 2 }.endpoint(), None);
    }

    #[test]
    fn problems_are_classified() {
        assert!(EventKind::EntryFailed {
            endpoint: "/x".into(),
            failure: FetchFailure::AuthRequiredMissing,
        }
        .is_problem());
        assert!(!EventKind::TemplateExpanded {
            source: "$".into(),
            instances: 2,
        }
        .is_problem());
        assert!(EventKind::RunCompleted {
            bound: 1,
            failed: 0,
            duration_ms: 3,
        }
        .is_run_event());
    }

    #[test]
    fn serializes_with_type_tag() {
        let kind = EventKind::EntryFailed {
            endpoint: "/api/items".into(),
            failure: FetchFailure::Http { status: 404 },
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["type"], "entry_failed");
        assert_eq!(value["endpoint"], "/api/items");
        assert_eq!(value["failure"], json!({"kind": "http", "status": 404}));
    }

    #[test]
    fn emit_assigns_sequential_ids() {
        let log = EventLog::new();
        assert!(log.is_empty());
        let first = log.emit(EventKind::RunStarted { entry_count: 1 });
        let second = log.emit(EventKind::EntryStarted {
            endpoint: "/a".into(),
        });
        assert_eq!((first, second), (0, 1));
        assert_eq!(log.filter_endpoint("/a").len(), 1);
        assert_eq!(log.to_json().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn clones_share_storage() {
        let log = EventLog::new();
        let clone = log.clone();
        clone.emit(EventKind::TemplateSkipped {
            path: "tags".into(),
            reason: "missing".into(),
        });
        assert_eq!(log.len(), 1);
        assert_eq!(log.problems().len(), 1);
    }
}
