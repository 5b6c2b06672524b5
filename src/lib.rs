//! Galleon - declarative JSON-to-document binding
//!
//! Elements marked with `data-gl-get` are filled from a JSON endpoint:
//! `data-gl-iterate` repeats an element per array item and `data-gl-bind*`
//! writes values into text, markup, form values or attributes.

pub mod binding;
pub mod config;
pub mod credential;
pub mod dom;
pub mod error;
pub mod event_log;
pub mod fetch;
pub mod logging;
pub mod orchestrator;
pub mod path;

pub use binding::{AttributeNames, BindType, BindingEngine, TemplateDisposal};
pub use config::GalleonConfig;
pub use credential::{CredentialEnvironment, CredentialSource, StaticEnvironment};
pub use dom::{Document, MemoryDocument};
pub use error::{FixSuggestion, GalleonError, Result};
pub use event_log::{Event, EventKind, EventLog};
pub use fetch::{FetchFailure, HttpFetcher, JsonSource};
pub use logging::LogLevel;
pub use orchestrator::Orchestrator;
pub use path::{PathExpression, PathResolver};
