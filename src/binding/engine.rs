//! Binding engine: plain bindings and template expansion
//!
//! Within one instance the order is fixed: nested templates are expanded
//! first (depth-first, pre-order), then plain bindings are applied to the
//! instance root and every descendant that is not part of a template.
//! Clones produced by a nested expansion are bound by that expansion and are
//! never rebound by the enclosing pass.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::GalleonConfig;
use crate::dom::Document;
use crate::error::{GalleonError, Result};
use crate::event_log::{EventKind, EventLog};
use crate::path;

use super::attributes::AttributeNames;
use super::directive::BindingDirective;
use super::TemplateDisposal;

/// Label of a template expanded without an endpoint
pub const ROOT_LABEL: &str = "$";

/// Applies directives and expands templates against JSON data
#[derive(Debug, Clone)]
pub struct BindingEngine {
    names: AttributeNames,
    disposal: TemplateDisposal,
    event_log: EventLog,
}

impl Default for BindingEngine {
    fn default() -> Self {
        Self::new(AttributeNames::default(), TemplateDisposal::default(), EventLog::new())
    }
}

impl BindingEngine {
    pub fn new(names: AttributeNames, disposal: TemplateDisposal, event_log: EventLog) -> Self {
        Self {
            names,
            disposal,
            event_log,
        }
    }

    pub fn from_config(config: &GalleonConfig, event_log: EventLog) -> Self {
        Self::new(
            AttributeNames::new(&config.attribute_prefix),
            config.template_disposal,
            event_log,
        )
    }

    pub fn names(&self) -> &AttributeNames {
        &self.names
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// True for a template hidden by an earlier expansion
    pub fn is_consumed<D: Document>(&self, doc: &D, node: D::Node) -> bool {
        doc.has_attribute(node, &self.names.template)
    }

    /// True when `node` sits inside a consumed template
    pub fn is_within_consumed<D: Document>(&self, doc: &D, node: D::Node) -> bool {
        doc.has_ancestor_where(node, |d, n| d.has_attribute(n, &self.names.template))
    }

    /// Apply every binding directive on `element`; returns how many were applied
    ///
    /// Directives whose path resolves to nothing are skipped. A directive that
    /// fails to apply is logged and does not stop the others.
    pub fn bind<D: Document>(&self, doc: &mut D, element: D::Node, data: &Value) -> usize {
        let mut applied = 0;
        for directive in BindingDirective::collect(doc, element, &self.names) {
            let Some(value) = path::resolve(data, &directive.source_path) else {
                debug!(
                    attribute = %directive.attribute,
                    path = %directive.source_path,
                    "No data for directive"
                );
                continue;
            };

            match directive.apply(doc, element, value) {
                Ok(()) => applied += 1,
                Err(e) => {
                    error!(error = %e, path = %directive.source_path, "Binding failed");
                    self.event_log.emit(EventKind::DirectiveFailed {
                        attribute: directive.attribute.clone(),
                        path: directive.source_path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        applied
    }

    /// Expand `template` once per item found at `path` (empty path: `data`)
    ///
    /// Returns the inserted clones in order. On failure the template is left
    /// untouched and the reason is logged and recorded. A detached template
    /// yields no clones and no error.
    pub fn expand_template<D: Document>(
        &self,
        doc: &mut D,
        template: D::Node,
        data: &Value,
        path: &str,
    ) -> Result<Vec<D::Node>> {
        self.expand_in_scope(doc, template, data, path, ROOT_LABEL)
    }

    /// Expand a root entry element, labelling clones with its endpoint
    pub fn expand_entry<D: Document>(
        &self,
        doc: &mut D,
        entry: D::Node,
        data: &Value,
        endpoint: &str,
    ) -> Result<Vec<D::Node>> {
        self.expand_in_scope(doc, entry, data, "", endpoint)
    }

    fn expand_in_scope<D: Document>(
        &self,
        doc: &mut D,
        template: D::Node,
        data: &Value,
        path: &str,
        scope: &str,
    ) -> Result<Vec<D::Node>> {
        let path = path.trim();
        if self.is_consumed(doc, template) || self.is_within_consumed(doc, template) {
            self.skip(path, "template was already consumed");
            return Ok(Vec::new());
        }
        if doc.parent(template).is_none() {
            // Nowhere to insert clones; the caller's subtree is gone
            self.skip(path, "template is detached");
            return Ok(Vec::new());
        }

        let is_root = path.is_empty();
        let label = if is_root {
            scope.to_string()
        } else {
            format!("{scope}.{path}")
        };

        let resolved = if is_root {
            Some(data)
        } else {
            path::resolve(data, path)
        };
        let Some(resolved) = resolved else {
            return Err(self.skip(path, "path resolved to nothing"));
        };

        let (instances, indexed): (Vec<&Value>, bool) = match resolved {
            Value::Array(items) => (items.iter().collect(), true),
            Value::Object(_) => (vec![resolved], false),
            other if is_root => (vec![other], false),
            other => {
                return Err(self.skip(
                    path,
                    &format!("expected an array or object, found {}", type_name(other)),
                ));
            }
        };

        let mut clones = Vec::with_capacity(instances.len());
        for (index, instance) in instances.into_iter().enumerate() {
            let clone = doc.clone_node(template)?;
            for marker in self.names.markers() {
                doc.remove_attribute(clone, marker);
            }
            doc.remove_attribute(clone, &self.names.template);
            doc.set_attribute(clone, &self.names.source, &label)?;
            doc.set_attribute(clone, &self.names.index, &index.to_string())?;

            let instance_scope = if indexed {
                format!("{label}[{index}]")
            } else {
                label.clone()
            };
            self.process_instance(doc, clone, instance, &instance_scope);

            doc.insert_before(clone, template)?;
            clones.push(clone);
        }

        match self.disposal {
            TemplateDisposal::Hide => {
                doc.set_attribute(template, "hidden", "")?;
                doc.set_attribute(template, &self.names.template, "")?;
            }
            TemplateDisposal::Remove => doc.remove(template)?,
        }

        info!(source = %label, instances = clones.len(), "Template expanded");
        self.event_log.emit(EventKind::TemplateExpanded {
            source: label,
            instances: clones.len(),
        });
        Ok(clones)
    }

    /// Expand nested templates of `node`, then bind `node` and its plain descendants
    fn process_instance<D: Document>(&self, doc: &mut D, node: D::Node, data: &Value, scope: &str) {
        let mut targets = vec![node];
        self.expand_nested(doc, node, data, scope, &mut targets);
        for target in targets {
            self.bind(doc, target, data);
        }
    }

    fn expand_nested<D: Document>(
        &self,
        doc: &mut D,
        parent: D::Node,
        data: &Value,
        scope: &str,
        targets: &mut Vec<D::Node>,
    ) {
        // Snapshot: clones inserted during the loop are already bound
        for child in doc.children(parent) {
            // Nested entry points are bound from their own payload
            if self.is_consumed(doc, child) || doc.has_attribute(child, &self.names.get) {
                continue;
            }
            if let Some(path) = doc.attribute(child, &self.names.iterate) {
                // Failures are already logged and recorded
                let _ = self.expand_in_scope(doc, child, data, &path, scope);
                continue;
            }
            targets.push(child);
            self.expand_nested(doc, child, data, scope, targets);
        }
    }

    fn skip(&self, path: &str, reason: &str) -> GalleonError {
        warn!(path, reason, "Template expansion skipped");
        self.event_log.emit(EventKind::TemplateSkipped {
            path: path.to_string(),
            reason: reason.to_string(),
        });
        GalleonError::TemplateSource {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
