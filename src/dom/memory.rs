//! Arena-backed in-memory document
//!
//! Nodes live in a `Vec` and refer to each other by index. Removed and
//! cloned-but-never-inserted nodes stay in the arena; they are simply
//! unreachable from the root and never serialized.

use std::fmt::Write as _;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{DomError, Document};

/// Rejects whitespace, quotes, `>`, `/`, `=` and control characters
static ATTRIBUTE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^\s"'>/=\x00-\x1F\x7F]+$"#).expect("valid attribute name regex")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Index of a node in a [`MemoryDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    /// Trusted markup written through `set_inner_html`
    Raw(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Serializable node tree, used to load documents from YAML or JSON
///
/// ```yaml
/// - tag: ul
///   children:
///     - tag: li
///       attrs: { data-gl-iterate: tags, data-gl-bind: "" }
/// - "plain text"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element(ElementSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
    /// Shorthand for a single leading text child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create an empty document holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Build a document whose root holds `specs`
    pub fn from_specs(specs: &[NodeSpec]) -> Result<Self, DomError> {
        let mut doc = Self::new();
        let root = doc.root();
        for spec in specs {
            doc.append_spec(root, spec)?;
        }
        Ok(doc)
    }

    /// Parse a YAML (or JSON) node list
    pub fn from_yaml_str(source: &str) -> crate::error::Result<Self> {
        let specs: Vec<NodeSpec> = serde_yaml::from_str(source)?;
        Ok(Self::from_specs(&specs)?)
    }

    fn append_spec(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId, DomError> {
        match spec {
            NodeSpec::Text(text) => self.append_text(parent, text),
            NodeSpec::Element(element) => {
                let node = self.create_element(&element.tag);
                for (name, value) in &element.attrs {
                    self.set_attribute(node, name, value)?;
                }
                if let Some(text) = &element.text {
                    self.append_text(node, text)?;
                }
                for child in &element.children {
                    self.append_spec(node, child)?;
                }
                self.append_child(parent, node)?;
                Ok(node)
            }
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn data(&self, node: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(node.0).ok_or(DomError::UnknownNode(node.0))
    }

    fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes
            .get_mut(node.0)
            .ok_or(DomError::UnknownNode(node.0))
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_hierarchy(child, parent)?;
        self.detach(child)?;
        self.data_mut(parent)?.children.push(child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let node = self.push(NodeKind::Text(text.to_string()));
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Concatenated text of `node` and its descendants
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.nodes.get(node.0) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) | NodeKind::Raw(text) => out.push_str(text),
            NodeKind::Root | NodeKind::Element { .. } => {
                for child in &data.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Serialized markup of the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(data) = self.nodes.get(node.0) {
            for child in &data.children {
                self.write_html(*child, &mut out);
            }
        }
        out
    }

    /// Serialized markup of `node` itself
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.nodes.get(node.0) else {
            return;
        };
        match &data.kind {
            NodeKind::Root => {
                for child in &data.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Raw(markup) => out.push_str(markup),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{}\"", escape_attribute(value));
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &data.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn attributes_mut(&mut self, node: NodeId) -> Result<&mut Vec<(String, String)>, DomError> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::NotAnElement),
        }
    }

    fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.data(node)?.parent else {
            return Ok(());
        };
        self.data_mut(parent)?.children.retain(|c| *c != node);
        self.data_mut(node)?.parent = None;
        Ok(())
    }

    /// `node` may not be placed under itself or one of its descendants
    fn check_hierarchy(&self, node: NodeId, new_parent: NodeId) -> Result<(), DomError> {
        let mut current = Some(new_parent);
        while let Some(id) = current {
            if id == node {
                return Err(DomError::HierarchyRequest);
            }
            current = self.data(id)?.parent;
        }
        Ok(())
    }

    fn replace_children(&mut self, node: NodeId, kind: NodeKind) -> Result<(), DomError> {
        if !matches!(self.data(node)?.kind, NodeKind::Element { .. }) {
            return Err(DomError::NotAnElement);
        }
        let old = std::mem::take(&mut self.data_mut(node)?.children);
        for child in old {
            self.data_mut(child)?.parent = None;
        }
        let content = self.push(kind);
        self.append_child(node, content)
    }

    fn deep_copy(&mut self, node: NodeId) -> Result<NodeId, DomError> {
        let data = self.data(node)?;
        let kind = match &data.kind {
            NodeKind::Root => return Err(DomError::NotAnElement),
            other => other.clone(),
        };
        let children = data.children.clone();
        let copy = self.push(kind);
        for child in children {
            let child_copy = self.deep_copy(child)?;
            self.data_mut(copy)?.children.push(child_copy);
            self.data_mut(child_copy)?.parent = Some(copy);
        }
        Ok(copy)
    }
}

impl Document for MemoryDocument {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|data| {
                data.children
                    .iter()
                    .copied()
                    .filter(|c| {
                        matches!(
                            self.nodes.get(c.0).map(|d| &d.kind),
                            Some(NodeKind::Element { .. })
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        match self.nodes.get(node.0).map(|d| &d.kind) {
            Some(NodeKind::Element { attributes, .. }) => {
                attributes.iter().map(|(n, _)| n.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if !ATTRIBUTE_NAME_RE.is_match(name) {
            return Err(DomError::InvalidAttributeName {
                name: name.to_string(),
            });
        }
        let name = name.to_ascii_lowercase();
        let attributes = self.attributes_mut(node)?;
        match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Ok(attributes) = self.attributes_mut(node) {
            attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.replace_children(node, NodeKind::Text(text.to_string()))
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), DomError> {
        self.replace_children(node, NodeKind::Raw(html.to_string()))
    }

    fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        match self.tag_name(node).as_deref() {
            Some("textarea") => self.set_text(node, value),
            Some(_) => self.set_attribute(node, "value", value),
            None => Err(DomError::NotAnElement),
        }
    }

    fn clone_node(&mut self, node: NodeId) -> Result<NodeId, DomError> {
        self.deep_copy(node)
    }

    fn insert_before(&mut self, node: NodeId, reference: NodeId) -> Result<(), DomError> {
        let parent = self.data(reference)?.parent.ok_or(DomError::Detached)?;
        if node == reference {
            return Err(DomError::HierarchyRequest);
        }
        self.check_hierarchy(node, parent)?;
        self.detach(node)?;
        let siblings = &mut self.data_mut(parent)?.children;
        let position = siblings
            .iter()
            .position(|c| *c == reference)
            .ok_or(DomError::Detached)?;
        siblings.insert(position, node);
        self.data_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        if node == self.root() {
            return Err(DomError::HierarchyRequest);
        }
        self.detach(node)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
