//! # treelint-rules
//!
//! Built-in lint rules for treelint.
//!
//! This crate provides the representative rule catalog for the treelint
//! engine, covering the hardest matching shapes: control-flow-aware promise
//! handling, order-sensitive middleware detection, and string-construction
//! tracing.
//!
//! ## Available Rules
//!
//! | Code | Name | Description |
//! |------|------|-------------|
//! | TL001 | `no-unhandled-promise` | Requires promise results to be awaited or given a rejection handler |
//! | TL002 | `require-route-guard` | Requires auth/CSRF guards on route registrations |
//! | TL003 | `no-string-queries` | Forbids query strings built from unescaped dynamic input |
//! | TL004 | `no-var` | Forbids `var` declarations (autofixable to `let`) |
//!
//! ## Usage
//!
//! ```ignore
//! use treelint_core::Linter;
//! use treelint_rules::{NoUnhandledPromise, NoVar};
//!
//! let linter = Linter::builder()
//!     .rule(NoUnhandledPromise::new())
//!     .rule(NoVar::new())
//!     .build()?;
//! ```

pub mod no_string_queries;
pub mod no_unhandled_promise;
pub mod no_var;
mod presets;
pub mod require_route_guard;

pub use no_string_queries::NoStringQueries;
pub use no_unhandled_promise::NoUnhandledPromise;
pub use no_var::NoVar;
pub use presets::{all_rules, minimal_rules, recommended_rules, security_rules, Preset};
pub use require_route_guard::RequireRouteGuard;

/// Re-export core types for convenience.
pub use treelint_core::{Finding, Linter, Rule, Severity};
