//! Engine error taxonomy.
//!
//! Only two situations abort a pass: a tree that violates the structural
//! invariants, and configuration that fails validation before the pass
//! starts. A rule that misbehaves mid-pass is contained and reported as a
//! synthetic finding instead (see the runner module).

use thiserror::Error;

/// Fatal errors surfaced to the caller of a pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input tree violates the tree model's structural invariants.
    #[error("malformed tree: {message}")]
    MalformedTree {
        /// Description of the violated invariant.
        message: String,
    },

    /// The configuration could not be parsed at all.
    #[error("failed to parse configuration: {message}")]
    ConfigSyntax {
        /// Parse error message.
        message: String,
    },

    /// Configuration names a rule identifier no registered rule declares.
    #[error("configuration references unknown rule `{rule}`")]
    UnknownRule {
        /// The unknown rule identifier.
        rule: String,
    },

    /// A configured option failed validation against the rule's schema.
    #[error("invalid option `{key}` for rule `{rule}`: {message}")]
    InvalidOption {
        /// Rule whose schema rejected the option.
        rule: String,
        /// Offending option key.
        key: String,
        /// Why the option was rejected.
        message: String,
    },

    /// Two rules were registered under the same identifier.
    #[error("duplicate rule identifier `{rule}`")]
    DuplicateRule {
        /// The duplicated identifier.
        rule: String,
    },
}

impl EngineError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedTree {
            message: message.into(),
        }
    }
}
