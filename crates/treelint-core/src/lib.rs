//! # treelint-core
//!
//! Core framework for rule-based static analysis over syntax trees.
//!
//! This crate provides the engine half of a linter: it consumes a validated
//! [`SourceTree`], builds scope and control-flow indexes over it in a single
//! pass, dispatches registered rules by node kind, reconciles autofixes, and
//! reports findings. It includes:
//!
//! - [`SourceTree`] and [`TreeBuilder`] for the arena-backed tree model
//! - [`ScopeIndex`] and [`ControlIndex`] for name resolution and control facts
//! - [`Rule`] trait and [`Descriptor`] for defining rules
//! - [`Linter`] for orchestrating a pass over one tree
//! - [`Finding`] and [`PassResult`] for reporting
//!
//! ## Example
//!
//! ```ignore
//! use treelint_core::{Config, Linter};
//!
//! let linter = Linter::builder()
//!     .rule(MyRule::new())
//!     .config(Config::parse(toml_text)?)
//!     .fix(true)
//!     .build()?;
//!
//! let result = linter.run(&tree);
//! println!("{}", result.format_report());
//! ```

mod config;
mod control;
mod error;
mod finding;
mod fixer;
mod indexer;
mod registry;
mod rule;
mod runner;
mod scope;
mod tree;

/// Reference front end used by test suites to build trees from source text.
pub mod fixture;

pub use config::{Config, OptionSchema, OptionSpec, RuleSettings, ValueKind};
pub use control::{ControlContext, ControlIndex};
pub use error::EngineError;
pub use finding::{
    Edit, Finding, FindingDiagnostic, Fix, FixStatus, Message, PassResult, Severity, Suggestion,
};
pub use rule::{Descriptor, Rule, RuleBox, RuleContext};
pub use runner::{Linter, LinterBuilder};
pub use scope::{Binding, BindingKind, Resolution, Scope, ScopeId, ScopeIndex, ScopeKind};
pub use tree::{NodeId, NodeKind, Role, SourceTree, Span, TreeBuilder};
