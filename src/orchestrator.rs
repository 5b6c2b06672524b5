//! Orchestrator: one binding pass over a document
//!
//! Entry points (`data-gl-get`) are discovered in document order and
//! processed one after another. Entry points inside freshly inserted clones
//! are queued right after the entry that produced them. A failing entry
//! leaves its subtree untouched and never stops the entries after it.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::binding::BindingEngine;
use crate::credential::parse_auth_list;
use crate::dom::Document;
use crate::event_log::{EventKind, EventLog};
use crate::fetch::{FetchFailure, JsonSource};

/// Drives fetch + binding for every entry point of a document
pub struct Orchestrator<S: JsonSource> {
    source: S,
    engine: BindingEngine,
}

/// Why an entry is not fetched
enum Skip {
    EmptyEndpoint,
    Detached,
    AlreadyConsumed,
    InsideConsumedTemplate,
}

impl Skip {
    fn reason(&self) -> &'static str {
        match self {
            Skip::EmptyEndpoint => "empty endpoint",
            Skip::Detached => "entry point is detached",
            Skip::AlreadyConsumed => "entry point was already expanded",
            Skip::InsideConsumedTemplate => "entry point is inside a consumed template",
        }
    }
}

impl<S: JsonSource> Orchestrator<S> {
    pub fn new(source: S, engine: BindingEngine) -> Self {
        Self { source, engine }
    }

    pub fn engine(&self) -> &BindingEngine {
        &self.engine
    }

    /// Run every entry point of `doc`; returns the engine's event log
    ///
    /// Never fails: fetch and binding problems are logged and recorded.
    #[instrument(skip_all)]
    pub async fn run<D: Document>(&self, doc: &mut D) -> EventLog {
        let log = self.engine.event_log().clone();
        let names = self.engine.names();
        let started = Instant::now();

        let root = doc.root();
        let mut entries: VecDeque<D::Node> = self.discover(&*doc, root).into();
        info!(entries = entries.len(), "Starting binding pass");
        log.emit(EventKind::RunStarted {
            entry_count: entries.len(),
        });

        let (mut bound, mut failed) = (0, 0);
        while let Some(entry) = entries.pop_front() {
            let endpoint = doc
                .attribute(entry, &names.get)
                .map(|e| e.trim().to_string())
                .unwrap_or_default();

            if let Some(skip) = self.check_entry(doc, entry, &endpoint) {
                warn!(endpoint = %endpoint, reason = skip.reason(), "Entry point skipped");
                log.emit(EventKind::EntrySkipped {
                    endpoint: endpoint.as_str().into(),
                    reason: skip.reason().to_string(),
                });
                continue;
            }

            let sources = match doc.attribute(entry, &names.auth).map(|l| parse_auth_list(&l)) {
                Some(Some(sources)) => sources,
                None => Vec::new(),
                Some(None) => {
                    error!(endpoint = %endpoint, "Auth list names no usable source; request not sent");
                    log.emit(EventKind::EntryFailed {
                        endpoint: endpoint.as_str().into(),
                        failure: FetchFailure::AuthRequiredMissing,
                    });
                    failed += 1;
                    continue;
                }
            };

            log.emit(EventKind::EntryStarted {
                endpoint: endpoint.as_str().into(),
            });
            let entry_started = Instant::now();

            let data = match self.source.fetch(&endpoint, &sources).await {
                Ok(data) => data,
                Err(failure) => {
                    error!(endpoint = %endpoint, failure = %failure, "Fetch failed");
                    log.emit(EventKind::EntryFailed {
                        endpoint: endpoint.as_str().into(),
                        failure,
                    });
                    failed += 1;
                    continue;
                }
            };

            match self.engine.expand_entry(doc, entry, &data, &endpoint) {
                Ok(clones) => {
                    debug!(endpoint = %endpoint, instances = clones.len(), "Entry point bound");
                    let nested: Vec<D::Node> = clones
                        .iter()
                        .flat_map(|&clone| self.discover(&*doc, clone))
                        .collect();
                    if !nested.is_empty() {
                        debug!(endpoint = %endpoint, nested = nested.len(), "Queued nested entry points");
                    }
                    for node in nested.into_iter().rev() {
                        entries.push_front(node);
                    }
                    log.emit(EventKind::EntryBound {
                        endpoint: endpoint.as_str().into(),
                        duration_ms: entry_started.elapsed().as_millis() as u64,
                    });
                    bound += 1;
                }
                Err(e) => {
                    log.emit(EventKind::EntrySkipped {
                        endpoint: endpoint.as_str().into(),
                        reason: e.to_string(),
                    });
                    failed += 1;
                }
            }
        }

        info!(bound, failed, "Binding pass complete");
        log.emit(EventKind::RunCompleted {
            bound,
            failed,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        log
    }

    /// Entry points below `node`, excluding consumed templates and their content
    fn discover<D: Document>(&self, doc: &D, node: D::Node) -> Vec<D::Node> {
        let names = self.engine.names();
        doc.descendants_where(node, |d, n| {
            d.has_attribute(n, &names.get)
                && !self.engine.is_consumed(d, n)
                && !self.engine.is_within_consumed(d, n)
        })
    }

    fn check_entry<D: Document>(&self, doc: &D, entry: D::Node, endpoint: &str) -> Option<Skip> {
        if endpoint.is_empty() {
            Some(Skip::EmptyEndpoint)
        } else if !doc.is_attached(entry) {
            Some(Skip::Detached)
        } else if self.engine.is_consumed(doc, entry) {
            Some(Skip::AlreadyConsumed)
        } else if self.engine.is_within_consumed(doc, entry) {
            // An earlier entry may have consumed this one's ancestor
            Some(Skip::InsideConsumedTemplate)
        } else {
            None
        }
    }
}
