//! Rule trait and the context handed to detection functions.

use std::any::Any;

use crate::config::{OptionSchema, RuleSettings};
use crate::control::{ControlContext, ControlIndex};
use crate::finding::{Finding, Message, Severity};
use crate::scope::{ScopeId, ScopeIndex};
use crate::tree::{NodeId, NodeKind, Span, SourceTree};

/// Static metadata a rule declares at registration time.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    /// Stable short diagnostic code (e.g. `TL001`).
    pub code: &'static str,
    /// Kebab-case rule identifier (e.g. `no-unhandled-promise`).
    pub id: &'static str,
    /// Brief description of what the rule checks.
    pub description: &'static str,
    /// Severity applied when the configuration does not override it.
    pub default_severity: Severity,
    /// Declared option schema, validated before the pass starts.
    pub schema: OptionSchema,
    /// Node kinds the rule wants to observe.
    pub interests: &'static [NodeKind],
    /// Whether the rule can emit automatic fixes.
    pub fixable: bool,
}

/// An independent pattern detector registered with the engine.
///
/// A rule is a pure function over `(node, context, state)`: it must not
/// mutate shared state, must not observe another rule's findings, and must
/// not panic for tree shapes it does not recognize; it returns no findings
/// for inputs outside its pattern.
///
/// # Example
///
/// ```ignore
/// use treelint_core::{Descriptor, Finding, NodeId, Rule, RuleContext, Severity};
///
/// pub struct NoDebugger;
///
/// impl Rule for NoDebugger {
///     fn descriptor(&self) -> Descriptor { /* ... */ }
///
///     fn check(&self, ctx: &RuleContext<'_>, node: NodeId, _state: &mut dyn Any) -> Vec<Finding> {
///         // inspect ctx.tree() at `node`, return findings
///         vec![]
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Static metadata for this rule.
    fn descriptor(&self) -> Descriptor;

    /// Creates the per-pass accumulator for this rule.
    ///
    /// The accumulator is threaded through the single left-to-right
    /// traversal and dropped when the pass ends, which keeps rules that
    /// need file-level memory (e.g. "was a global middleware installed
    /// earlier") pure with respect to the engine.
    fn begin_pass(&self) -> Box<dyn Any> {
        Box::new(())
    }

    /// Inspects one node and returns zero or more findings.
    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, state: &mut dyn Any) -> Vec<Finding>;
}

/// Type alias for boxed rule trait objects.
pub type RuleBox = Box<dyn Rule>;

/// Read-only view a rule receives at each dispatched node.
pub struct RuleContext<'a> {
    pub(crate) tree: &'a SourceTree,
    pub(crate) scopes: &'a ScopeIndex,
    pub(crate) control: &'a ControlIndex,
    pub(crate) rule: &'static str,
    pub(crate) code: &'static str,
    pub(crate) severity: Severity,
    pub(crate) settings: &'a RuleSettings,
}

impl<'a> RuleContext<'a> {
    /// The tree being analyzed.
    #[must_use]
    pub fn tree(&self) -> &'a SourceTree {
        self.tree
    }

    /// The scope index for this tree.
    #[must_use]
    pub fn scopes(&self) -> &'a ScopeIndex {
        self.scopes
    }

    /// Control-flow facts for a node.
    #[must_use]
    pub fn control(&self, node: NodeId) -> ControlContext {
        self.control.context(node)
    }

    /// Nearest enclosing scope of a node.
    #[must_use]
    pub fn scope_of(&self, node: NodeId) -> ScopeId {
        self.scopes.scope_of(node)
    }

    /// This rule's resolved configuration options.
    #[must_use]
    pub fn options(&self) -> &'a RuleSettings {
        self.settings
    }

    /// The severity findings from this rule will carry.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Creates a finding for this rule at the given span, filling in the
    /// resolved severity and display position.
    #[must_use]
    pub fn finding(&self, span: Span, message: Message) -> Finding {
        let (line, column) = self.tree.line_col(span.start);
        Finding::new(self.rule, self.code, self.severity, span, line, column, message)
    }
}
