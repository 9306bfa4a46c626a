//! Per-node control-flow facts, snapshotted during the indexing walk.

use crate::tree::NodeId;

/// Derived control facts for one node.
///
/// Each value reflects the node's own position at visit time, never a
/// sibling's: the indexer snapshots its enter/exit stacks onto the side
/// table as each node is entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlContext {
    /// Nearest enclosing `try` statement whose protected block contains the
    /// node, if any. Code inside a catch handler is not protected.
    pub enclosing_try: Option<NodeId>,
    /// Nearest enclosing function, if any.
    pub enclosing_fn: Option<NodeId>,
    /// Whether the nearest enclosing function is declared asynchronous.
    pub in_async_fn: bool,
    /// Whether the node is an expression whose result is discarded as a
    /// bare expression statement.
    pub is_discarded: bool,
}

/// Node-indexed table of [`ControlContext`] values.
#[derive(Debug)]
pub struct ControlIndex {
    pub(crate) table: Vec<ControlContext>,
}

impl ControlIndex {
    /// Control facts for a node.
    #[must_use]
    pub fn context(&self, node: NodeId) -> ControlContext {
        self.table[node.index()]
    }
}
