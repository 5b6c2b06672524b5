//! Minimal document-tree interface
//!
//! The binding engine only ever talks to a [`Document`]. Anything that can
//! read and write attributes, deep-clone a node, insert before a sibling and
//! detach a node can host bindings. [`MemoryDocument`] is the in-process
//! implementation used by the CLI and the tests.

mod memory;

use std::fmt;
use std::hash::Hash;

use thiserror::Error;

pub use memory::{ElementSpec, MemoryDocument, NodeId, NodeSpec};

/// Errors raised by tree operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("invalid attribute name '{name}'")]
    InvalidAttributeName { name: String },

    #[error("node has no parent")]
    Detached,

    #[error("unknown node {0}")]
    UnknownNode(usize),

    #[error("node is not an element")]
    NotAnElement,

    #[error("cannot insert a node relative to itself or its own descendant")]
    HierarchyRequest,
}

/// Tree operations the binding engine needs
///
/// `children` yields element children only, in document order.
pub trait Document {
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// The top of the tree; never bound or cloned itself
    fn root(&self) -> Self::Node;

    /// Lower-case tag name, `None` for the root
    fn tag_name(&self, node: Self::Node) -> Option<String>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<String>;

    /// Attribute names in declaration order
    fn attribute_names(&self, node: Self::Node) -> Vec<String>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&mut self, node: Self::Node, name: &str);

    /// Replace all content of `node` with a single text node
    fn set_text(&mut self, node: Self::Node, text: &str) -> Result<(), DomError>;

    /// Replace all content of `node` with trusted markup
    fn set_inner_html(&mut self, node: Self::Node, html: &str) -> Result<(), DomError>;

    /// Set the value of a form control
    fn set_value(&mut self, node: Self::Node, value: &str) -> Result<(), DomError>;

    /// Deep clone; the copy starts detached
    fn clone_node(&mut self, node: Self::Node) -> Result<Self::Node, DomError>;

    /// Insert `node` as the preceding sibling of `reference`
    fn insert_before(&mut self, node: Self::Node, reference: Self::Node) -> Result<(), DomError>;

    /// Detach `node` from its parent; detached nodes are left alone
    fn remove(&mut self, node: Self::Node) -> Result<(), DomError>;

    fn has_attribute(&self, node: Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Pre-order descendants of `node` (excluding `node`) matching `predicate`
    fn descendants_where<F>(&self, node: Self::Node, predicate: F) -> Vec<Self::Node>
    where
        F: Fn(&Self, Self::Node) -> bool,
    {
        let mut found = Vec::new();
        let mut stack: Vec<Self::Node> = self.children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if predicate(self, current) {
                found.push(current);
            }
            stack.extend(self.children(current).into_iter().rev());
        }
        found
    }

    /// True when `node` is reachable from the root
    fn is_attached(&self, node: Self::Node) -> bool {
        let root = self.root();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// True when any proper ancestor of `node` matches `predicate`
    fn has_ancestor_where<F>(&self, node: Self::Node, predicate: F) -> bool
    where
        F: Fn(&Self, Self::Node) -> bool,
    {
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            if predicate(self, ancestor) {
                return true;
            }
            current = self.parent(ancestor);
        }
        false
    }
}
