//! Single upfront traversal building the scope tree and the control table.
//!
//! One depth-first walk, O(tree size), no backtracking: scope-introducing
//! nodes push a frame, binding-introducing nodes register into the
//! appropriate enclosing scope, identifier references resolve outward, and
//! the current try/function stacks are snapshotted per node on entry.

use std::collections::HashMap;

use tracing::debug;

use crate::control::{ControlContext, ControlIndex};
use crate::scope::{Binding, BindingKind, Resolution, Scope, ScopeId, ScopeIndex, ScopeKind};
use crate::tree::{NodeId, NodeKind, Role, SourceTree};

/// Builds both indices for one tree.
pub(crate) fn build(tree: &SourceTree) -> (ScopeIndex, ControlIndex) {
    let mut indexer = Indexer {
        tree,
        scopes: Vec::new(),
        scope_stack: Vec::new(),
        scope_of: vec![ScopeId::from_index(0); tree.node_count()],
        resolutions: HashMap::new(),
        unresolved: Vec::new(),
        control: vec![ControlContext::default(); tree.node_count()],
        try_stack: Vec::new(),
        fn_stack: Vec::new(),
    };

    let root = tree.root();
    indexer.push_scope(ScopeKind::Module, root);
    indexer.record(root);
    for child in tree.children_in_order(root) {
        indexer.visit(*child);
    }
    indexer.pop_scope();

    debug!(
        scopes = indexer.scopes.len(),
        resolved = indexer.resolutions.len(),
        unresolved = indexer.unresolved.len(),
        "scope index built"
    );

    (
        ScopeIndex {
            scopes: indexer.scopes,
            scope_of: indexer.scope_of,
            resolutions: indexer.resolutions,
            unresolved: indexer.unresolved,
        },
        ControlIndex {
            table: indexer.control,
        },
    )
}

struct Indexer<'t> {
    tree: &'t SourceTree,
    scopes: Vec<Scope>,
    scope_stack: Vec<ScopeId>,
    scope_of: Vec<ScopeId>,
    resolutions: HashMap<NodeId, Resolution>,
    unresolved: Vec<NodeId>,
    control: Vec<ControlContext>,
    try_stack: Vec<NodeId>,
    fn_stack: Vec<(NodeId, bool)>,
}

impl Indexer<'_> {
    fn current_scope(&self) -> ScopeId {
        self.scope_stack
            .last()
            .copied()
            .unwrap_or_else(|| ScopeId::from_index(0))
    }

    fn push_scope(&mut self, kind: ScopeKind, owner: NodeId) -> ScopeId {
        let id = ScopeId::from_index(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            owner,
            parent: self.scope_stack.last().copied(),
            bindings: std::collections::BTreeMap::new(),
        });
        self.scope_stack.push(id);
        id
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    /// Nearest enclosing scope that receives `var` and function bindings.
    fn var_scope(&self) -> ScopeId {
        for id in self.scope_stack.iter().rev() {
            match self.scopes[id.index()].kind {
                ScopeKind::Function | ScopeKind::Module => return *id,
                ScopeKind::Block | ScopeKind::Catch => {}
            }
        }
        ScopeId::from_index(0)
    }

    fn bind(&mut self, scope: ScopeId, declaration: NodeId, kind: BindingKind) {
        let Some(name) = self.tree.text(declaration) else {
            return;
        };
        // First declaration wins; redeclaration keeps the original binding.
        self.scopes[scope.index()]
            .bindings
            .entry(name.to_string())
            .or_insert(Binding {
                kind,
                declaration,
                references: Vec::new(),
            });
    }

    /// Snapshots the side tables for one node.
    fn record(&mut self, node: NodeId) {
        self.control[node.index()] = ControlContext {
            enclosing_try: self.try_stack.last().copied(),
            enclosing_fn: self.fn_stack.last().map(|(f, _)| *f),
            in_async_fn: self.fn_stack.last().is_some_and(|(_, is_async)| *is_async),
            is_discarded: self.tree.role(node) == Some(Role::Expr)
                && self
                    .tree
                    .parent(node)
                    .is_some_and(|p| self.tree.kind(p) == NodeKind::ExprStmt),
        };
        self.scope_of[node.index()] = self.current_scope();
    }

    fn visit(&mut self, node: NodeId) {
        self.record(node);

        match self.tree.kind(node) {
            NodeKind::FunctionDecl => {
                if let Some(name) = self.tree.child(node, Role::Name) {
                    self.record(name);
                    let target = self.var_scope();
                    self.bind(target, name, BindingKind::Function);
                }
                self.visit_function(node, /* bind_own_name: */ false);
            }
            NodeKind::FunctionExpr => self.visit_function(node, true),
            NodeKind::ArrowFunction => self.visit_function(node, false),
            NodeKind::Block => {
                self.push_scope(ScopeKind::Block, node);
                self.visit_children(node);
                self.pop_scope();
            }
            NodeKind::CatchClause => {
                self.push_scope(ScopeKind::Catch, node);
                if let Some(param) = self.tree.child(node, Role::Param) {
                    self.record(param);
                    let scope = self.current_scope();
                    self.bind(scope, param, BindingKind::CatchParam);
                }
                if let Some(body) = self.tree.child(node, Role::Body) {
                    self.visit(body);
                }
                self.pop_scope();
            }
            NodeKind::TryStmt => {
                if let Some(block) = self.tree.child(node, Role::TryBlock) {
                    self.try_stack.push(node);
                    self.visit(block);
                    self.try_stack.pop();
                }
                if let Some(handler) = self.tree.child(node, Role::Handler) {
                    self.visit(handler);
                }
            }
            NodeKind::VarDecl => {
                let block_scoped = matches!(self.tree.text(node), Some("let" | "const"));
                let kind = match self.tree.text(node) {
                    Some("let") => BindingKind::Let,
                    Some("const") => BindingKind::Const,
                    _ => BindingKind::Var,
                };
                for declarator in self.tree.children(node, Role::Declarations).to_vec() {
                    self.record(declarator);
                    if let Some(name) = self.tree.child(declarator, Role::Name) {
                        self.record(name);
                        let target = if block_scoped {
                            self.current_scope()
                        } else {
                            self.var_scope()
                        };
                        self.bind(target, name, kind);
                    }
                    if let Some(init) = self.tree.child(declarator, Role::Init) {
                        self.visit(init);
                    }
                }
            }
            NodeKind::MemberExpr => {
                if let Some(object) = self.tree.child(node, Role::Object) {
                    self.visit(object);
                }
                // Property names are not identifier references.
                if let Some(property) = self.tree.child(node, Role::Property) {
                    self.record(property);
                }
            }
            NodeKind::Identifier => self.resolve_reference(node),
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: NodeId) {
        for child in self.tree.children_in_order(node).to_vec() {
            self.visit(child);
        }
    }

    fn visit_function(&mut self, node: NodeId, bind_own_name: bool) {
        let is_async = self.tree.is_async_fn(node);
        let scope = self.push_scope(ScopeKind::Function, node);
        self.fn_stack.push((node, is_async));

        if bind_own_name {
            // A function expression's name is visible inside its own body.
            if let Some(name) = self.tree.child(node, Role::Name) {
                self.record(name);
                self.bind(scope, name, BindingKind::Function);
            }
        }
        for param in self.tree.children(node, Role::Params).to_vec() {
            self.record(param);
            self.bind(scope, param, BindingKind::Param);
        }
        if let Some(body) = self.tree.child(node, Role::Body) {
            if self.tree.kind(body) == NodeKind::Block {
                // The body block shares the function scope.
                self.record(body);
                self.visit_children(body);
            } else {
                // Expression-bodied arrow function.
                self.visit(body);
            }
        }

        self.fn_stack.pop();
        self.pop_scope();
    }

    fn resolve_reference(&mut self, node: NodeId) {
        let Some(name) = self.tree.text(node) else {
            return;
        };
        let mut current = Some(self.current_scope());
        while let Some(id) = current {
            if let Some(binding) = self.scopes[id.index()].bindings.get_mut(name) {
                binding.references.push(node);
                let resolution = Resolution {
                    scope: id,
                    declaration: binding.declaration,
                    kind: binding.kind,
                };
                self.resolutions.insert(node, resolution);
                return;
            }
            current = self.scopes[id.index()].parent;
        }
        self.unresolved.push(node);
    }
}
