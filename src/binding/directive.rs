//! Binding directives: one attribute, one DOM mutation

use serde_json::Value;

use crate::dom::Document;
use crate::error::{GalleonError, Result};

use super::attributes::AttributeNames;

/// How a resolved value is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindType {
    /// `data-gl-bind`: text content
    Text,
    /// `data-gl-bind-html`: inner markup, written as trusted
    Html,
    /// `data-gl-bind-value`: form-control value
    Value,
    /// `data-gl-bind-<name>`: any other attribute
    Attribute(String),
}

/// A binding attribute found on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDirective {
    /// The attribute the directive came from
    pub attribute: String,
    pub bind_type: BindType,
    /// Path resolved against the current data context
    pub source_path: String,
}

impl BindingDirective {
    /// All directives on `node`, in attribute order
    pub fn collect<D: Document>(doc: &D, node: D::Node, names: &AttributeNames) -> Vec<Self> {
        doc.attribute_names(node)
            .into_iter()
            .filter_map(|attribute| {
                let bind_type = names.bind_type(&attribute)?;
                let source_path = doc.attribute(node, &attribute).unwrap_or_default();
                Some(Self {
                    attribute,
                    bind_type,
                    source_path,
                })
            })
            .collect()
    }

    /// Write `value` onto `node`
    pub fn apply<D: Document>(&self, doc: &mut D, node: D::Node, value: &Value) -> Result<()> {
        let text = stringify(value);
        let outcome = match &self.bind_type {
            BindType::Text => doc.set_text(node, &text),
            BindType::Html => doc.set_inner_html(node, &text),
            BindType::Value => doc.set_value(node, &text),
            BindType::Attribute(name) => doc.set_attribute(node, name, &text),
        };
        outcome.map_err(|e| GalleonError::Binding {
            attribute: self.attribute.clone(),
            reason: e.to_string(),
        })
    }
}

/// Text form of a JSON value as written into the document
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
