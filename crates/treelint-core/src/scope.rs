//! Lexical scope index: bindings, references, and resolutions.
//!
//! Built once per pass by the indexer and immutable afterwards. Rules read
//! it through [`crate::RuleContext`].

use std::collections::{BTreeMap, HashMap};

use crate::tree::NodeId;

/// Stable identity of one scope within a [`ScopeIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(index as u32)
    }
}

/// What kind of lexical region a scope covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The file root.
    Module,
    /// A function body (also receives hoisted `var` bindings).
    Function,
    /// A braced block with its own block-scoped bindings.
    Block,
    /// A catch clause (owns the catch parameter).
    Catch,
}

/// How a name was introduced into its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var` declaration (function-scoped).
    Var,
    /// `let` declaration (block-scoped).
    Let,
    /// `const` declaration (block-scoped).
    Const,
    /// Function declaration.
    Function,
    /// Function parameter.
    Param,
    /// Catch clause parameter.
    CatchParam,
}

/// Metadata of one name bound in a scope.
#[derive(Debug)]
pub struct Binding {
    /// How the name was introduced.
    pub kind: BindingKind,
    /// The identifier node at the declaration site.
    pub declaration: NodeId,
    /// Identifier nodes that resolved to this binding, in source order.
    pub references: Vec<NodeId>,
}

/// One lexical region and the names it owns.
#[derive(Debug)]
pub struct Scope {
    /// Region kind.
    pub kind: ScopeKind,
    /// Node that introduced the scope.
    pub owner: NodeId,
    /// Enclosing scope; `None` only for the module scope.
    pub parent: Option<ScopeId>,
    pub(crate) bindings: BTreeMap<String, Binding>,
}

impl Scope {
    /// Looks up a name bound directly in this scope.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Names bound directly in this scope, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// Where a reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Scope owning the binding.
    pub scope: ScopeId,
    /// Identifier node at the declaration site.
    pub declaration: NodeId,
    /// Kind of the resolved binding.
    pub kind: BindingKind,
}

/// The scope tree for one source tree.
#[derive(Debug)]
pub struct ScopeIndex {
    pub(crate) scopes: Vec<Scope>,
    pub(crate) scope_of: Vec<ScopeId>,
    pub(crate) resolutions: HashMap<NodeId, Resolution>,
    pub(crate) unresolved: Vec<NodeId>,
}

impl ScopeIndex {
    /// The module (root) scope.
    #[must_use]
    pub fn module(&self) -> ScopeId {
        ScopeId::from_index(0)
    }

    /// Scope data for a scope id.
    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Number of scopes in the index.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Nearest enclosing scope of a node.
    #[must_use]
    pub fn scope_of(&self, node: NodeId) -> ScopeId {
        self.scope_of[node.index()]
    }

    /// Resolves a name by walking scope ancestors outward from `from`.
    #[must_use]
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<Resolution> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(binding) = scope.bindings.get(name) {
                return Some(Resolution {
                    scope: id,
                    declaration: binding.declaration,
                    kind: binding.kind,
                });
            }
            current = scope.parent;
        }
        None
    }

    /// Recorded resolution for a reference identifier, if it resolved.
    #[must_use]
    pub fn resolution(&self, reference: NodeId) -> Option<Resolution> {
        self.resolutions.get(&reference).copied()
    }

    /// Identifier references that no scope in the chain defined.
    ///
    /// These are reported as facts, never as engine errors: cross-module
    /// bindings are out of scope for the index.
    #[must_use]
    pub fn unresolved(&self) -> &[NodeId] {
        &self.unresolved
    }
}
