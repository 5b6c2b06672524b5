//! Binding module - attribute directives and template expansion
//!
//! Contains:
//! - `attributes`: the `data-gl-*` vocabulary derived from one prefix
//! - `directive`: BindType + BindingDirective (one attribute, one mutation)
//! - `engine`: BindingEngine (bind + expand_template)

mod attributes;
mod directive;
mod engine;

use serde::{Deserialize, Serialize};

pub use attributes::{AttributeNames, DEFAULT_PREFIX};
pub use directive::{stringify, BindType, BindingDirective};
pub use engine::{BindingEngine, ROOT_LABEL};

/// What happens to a template once its clones are inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateDisposal {
    /// Keep it in place with `hidden` and the consumed marker
    #[default]
    Hide,
    /// Detach it from the tree
    Remove,
}
