//! Immutable, position-annotated syntax tree consumed by rules.
//!
//! The tree is produced by an external parser through [`TreeBuilder`] and is
//! read-only for the duration of one analysis pass. Nodes are addressed by
//! [`NodeId`] (a stable arena index), so side tables built by the indexing
//! phase can be plain vectors keyed by node identity.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A half-open byte range `[start, end)` into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if `other` lies fully inside this span.
    #[must_use]
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two spans share at least one byte.
    ///
    /// Touching spans (`a.end == b.start`) do not overlap, which is what
    /// allows adjacent fixes to coexist.
    #[must_use]
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Stable identity of one node within a [`SourceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(index as u32)
    }
}

/// Closed set of node kinds over the analyzed grammar.
///
/// The set is deliberately a closed enum rather than a string tag: the
/// dispatch table in the matcher registry is built once over these variants,
/// and rules declare their interests as `&'static [NodeKind]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Root of one source file.
    Program,
    /// `function name(..) {..}` statement. Payload text `"async"` marks an
    /// asynchronous function.
    FunctionDecl,
    /// Anonymous or named function in expression position.
    FunctionExpr,
    /// Arrow function expression.
    ArrowFunction,
    /// `{ .. }` statement list.
    Block,
    /// Variable declaration statement. Payload text is the declaration
    /// keyword: `"var"`, `"let"` or `"const"`.
    VarDecl,
    /// One `name = init` entry of a variable declaration.
    Declarator,
    /// Identifier; payload text is the name.
    Identifier,
    /// String literal; payload text is the unquoted value.
    StringLit,
    /// Numeric literal; payload text is the raw digits.
    NumberLit,
    /// Template literal with interleaved chunks and expressions.
    TemplateLit,
    /// Literal chunk of a template literal; payload text is the raw chunk.
    TemplateChunk,
    /// Call expression.
    CallExpr,
    /// `object.property` access.
    MemberExpr,
    /// `await expr`.
    AwaitExpr,
    /// `try {..} catch (e) {..}`.
    TryStmt,
    /// `catch (e) {..}` handler of a try statement.
    CatchClause,
    /// Expression used as a statement; its result is discarded.
    ExprStmt,
    /// `return expr?`.
    ReturnStmt,
    /// Binary operator expression; payload text is the operator.
    BinaryExpr,
    /// `void expr` explicit-discard operator.
    VoidExpr,
}

/// Role a child plays under its parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Function or declarator name.
    Name,
    /// Function parameter list.
    Params,
    /// Function, program, block, or catch body.
    Body,
    /// Callee of a call expression.
    Callee,
    /// Argument list of a call expression.
    Args,
    /// Object of a member expression.
    Object,
    /// Property of a member expression.
    Property,
    /// Declarator list of a variable declaration.
    Declarations,
    /// Declarator initializer.
    Init,
    /// Protected block of a try statement.
    TryBlock,
    /// Catch clause of a try statement.
    Handler,
    /// Catch parameter.
    Param,
    /// Wrapped expression (statement, await, void, return).
    Expr,
    /// Left operand of a binary expression.
    Left,
    /// Right operand of a binary expression.
    Right,
    /// Interleaved chunks and expressions of a template literal.
    Parts,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    span: Span,
    text: Option<String>,
    parent: Option<NodeId>,
    role: Option<Role>,
    slots: Vec<(Role, Vec<NodeId>)>,
    ordered: Vec<NodeId>,
}

/// One parsed source file: the source text plus its node arena.
///
/// All accessors are cheap lookups; node identity is stable for the lifetime
/// of the tree.
#[derive(Debug)]
pub struct SourceTree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
    line_starts: Vec<usize>,
}

impl SourceTree {
    /// Root node of the tree.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Kind tag of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    /// Source span of a node.
    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// Token payload of a node (identifier name, literal value, operator,
    /// declaration keyword, async marker).
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    /// Parent of a node; `None` only for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Role this node plays under its parent; `None` only for the root.
    #[must_use]
    pub fn role(&self, id: NodeId) -> Option<Role> {
        self.nodes[id.index()].role
    }

    /// Single child under the given role, if present.
    #[must_use]
    pub fn child(&self, id: NodeId, role: Role) -> Option<NodeId> {
        self.children(id, role).first().copied()
    }

    /// All children under the given role, in source order.
    #[must_use]
    pub fn children(&self, id: NodeId, role: Role) -> &[NodeId] {
        self.nodes[id.index()]
            .slots
            .iter()
            .find(|(r, _)| *r == role)
            .map_or(&[], |(_, ids)| ids.as_slice())
    }

    /// All children of a node across every role, ordered by span start.
    #[must_use]
    pub fn children_in_order(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].ordered
    }

    /// Whether a node is a function marked asynchronous.
    #[must_use]
    pub fn is_async_fn(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::FunctionDecl | NodeKind::FunctionExpr | NodeKind::ArrowFunction
        ) && self.text(id) == Some("async")
    }

    /// The full original source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text covered by a span.
    #[must_use]
    pub fn snippet(&self, span: Span) -> &str {
        self.source.get(span.start..span.end).unwrap_or("")
    }

    /// Converts a byte offset into a 1-indexed `(line, column)` pair.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

/// Construction surface used by the parser collaborator (and by tests).
///
/// Nodes are allocated first, then attached to their parent under a role;
/// [`TreeBuilder::finish`] validates the structural invariants and freezes
/// the tree.
#[derive(Debug)]
pub struct TreeBuilder {
    source: String,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Starts a builder over the given source text.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
        }
    }

    /// Allocates a node without a token payload.
    pub fn node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.alloc(kind, span, None)
    }

    /// Allocates a node carrying a token payload.
    pub fn token(&mut self, kind: NodeKind, span: Span, text: impl Into<String>) -> NodeId {
        self.alloc(kind, span, Some(text.into()))
    }

    fn alloc(&mut self, kind: NodeKind, span: Span, text: Option<String>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node {
            kind,
            span,
            text,
            parent: None,
            role: None,
            slots: Vec::new(),
            ordered: Vec::new(),
        });
        id
    }

    /// Span of an already-allocated node.
    #[must_use]
    pub fn span_of(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// Attaches `child` under `parent` in the given role.
    ///
    /// Repeated calls with the same role append to that role's sequence.
    pub fn attach(&mut self, parent: NodeId, role: Role, child: NodeId) {
        let node = &mut self.nodes[parent.index()];
        match node.slots.iter_mut().find(|(r, _)| *r == role) {
            Some((_, ids)) => ids.push(child),
            None => node.slots.push((role, vec![child])),
        }
        let child_node = &mut self.nodes[child.index()];
        child_node.parent = Some(parent);
        child_node.role = Some(role);
    }

    /// Validates the tree and freezes it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedTree`] when a node other than the
    /// root is unattached, a child span escapes its parent's span, or
    /// sibling spans overlap. These are defensive invariant checks, not
    /// normal operating paths.
    pub fn finish(mut self, root: NodeId) -> Result<SourceTree, EngineError> {
        if self.nodes[root.index()].parent.is_some() {
            return Err(EngineError::malformed("root node has a parent"));
        }

        let source_span = Span::new(0, self.source.len());
        for index in 0..self.nodes.len() {
            let id = NodeId::from_index(index);
            let node = &self.nodes[index];
            if node.parent.is_none() && id != root {
                return Err(EngineError::malformed(format!(
                    "node {index} ({:?}) is not attached to the tree",
                    node.kind
                )));
            }
            if !source_span.contains(node.span) {
                return Err(EngineError::malformed(format!(
                    "span {}..{} of {:?} exceeds source length {}",
                    node.span.start,
                    node.span.end,
                    node.kind,
                    self.source.len()
                )));
            }

            let mut ordered: Vec<NodeId> = node
                .slots
                .iter()
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect();
            ordered.sort_by_key(|c| self.nodes[c.index()].span.start);

            for pair in ordered.windows(2) {
                let a = self.nodes[pair[0].index()].span;
                let b = self.nodes[pair[1].index()].span;
                if a.overlaps(b) {
                    return Err(EngineError::malformed(format!(
                        "sibling spans {}..{} and {}..{} overlap under {:?}",
                        a.start, a.end, b.start, b.end, node.kind
                    )));
                }
            }
            for child in &ordered {
                let child_span = self.nodes[child.index()].span;
                if !node.span.contains(child_span) {
                    return Err(EngineError::malformed(format!(
                        "child span {}..{} escapes parent {:?} span {}..{}",
                        child_span.start,
                        child_span.end,
                        node.kind,
                        node.span.start,
                        node.span.end
                    )));
                }
            }
            self.nodes[index].ordered = ordered;
        }

        let mut line_starts = vec![0];
        for (offset, byte) in self.source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }

        Ok(SourceTree {
            source: self.source,
            nodes: self.nodes,
            root,
            line_starts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_tree() -> Result<SourceTree, EngineError> {
        let mut b = TreeBuilder::new("x;");
        let program = b.node(NodeKind::Program, Span::new(0, 2));
        let stmt = b.node(NodeKind::ExprStmt, Span::new(0, 2));
        let ident = b.token(NodeKind::Identifier, Span::new(0, 1), "x");
        b.attach(program, Role::Body, stmt);
        b.attach(stmt, Role::Expr, ident);
        b.finish(program)
    }

    #[test]
    fn builds_and_navigates() {
        let tree = leaf_tree().expect("valid tree");
        let root = tree.root();
        assert_eq!(tree.kind(root), NodeKind::Program);
        let stmt = tree.child(root, Role::Body).expect("stmt");
        let ident = tree.child(stmt, Role::Expr).expect("ident");
        assert_eq!(tree.text(ident), Some("x"));
        assert_eq!(tree.parent(ident), Some(stmt));
        assert_eq!(tree.role(ident), Some(Role::Expr));
        assert_eq!(tree.snippet(tree.span(ident)), "x");
    }

    #[test]
    fn rejects_child_span_escaping_parent() {
        let mut b = TreeBuilder::new("abcdef");
        let program = b.node(NodeKind::Program, Span::new(0, 3));
        let stmt = b.node(NodeKind::ExprStmt, Span::new(2, 6));
        b.attach(program, Role::Body, stmt);
        let err = b.finish(program).expect_err("must be malformed");
        assert!(matches!(err, EngineError::MalformedTree { .. }));
    }

    #[test]
    fn rejects_overlapping_siblings() {
        let mut b = TreeBuilder::new("abcdef");
        let program = b.node(NodeKind::Program, Span::new(0, 6));
        let a = b.node(NodeKind::ExprStmt, Span::new(0, 4));
        let c = b.node(NodeKind::ExprStmt, Span::new(3, 6));
        b.attach(program, Role::Body, a);
        b.attach(program, Role::Body, c);
        assert!(b.finish(program).is_err());
    }

    #[test]
    fn rejects_detached_node() {
        let mut b = TreeBuilder::new("ab");
        let program = b.node(NodeKind::Program, Span::new(0, 2));
        let _orphan = b.node(NodeKind::ExprStmt, Span::new(0, 1));
        assert!(b.finish(program).is_err());
    }

    #[test]
    fn line_col_is_one_indexed() {
        let mut b = TreeBuilder::new("a;\nbb;\n");
        let program = b.node(NodeKind::Program, Span::new(0, 7));
        let tree = b.finish(program).expect("valid tree");
        assert_eq!(tree.line_col(0), (1, 1));
        assert_eq!(tree.line_col(3), (2, 1));
        assert_eq!(tree.line_col(5), (2, 3));
    }

    #[test]
    fn span_overlap_semantics() {
        let a = Span::new(0, 4);
        assert!(a.overlaps(Span::new(3, 5)));
        assert!(!a.overlaps(Span::new(4, 6)));
        assert!(a.contains(Span::new(1, 4)));
        assert!(!a.contains(Span::new(1, 5)));
    }
}
