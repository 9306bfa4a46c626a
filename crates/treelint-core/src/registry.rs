//! Kind-indexed dispatch table from node kind to interested rules.
//!
//! Built once when the linter is constructed, so the single traversal
//! dispatches each node to exactly the rules that declared interest in its
//! kind, never O(rules × tree size).

use std::collections::BTreeMap;

use crate::tree::NodeKind;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    buckets: BTreeMap<NodeKind, Vec<usize>>,
}

impl Registry {
    /// Builds the table from `(rule index, interest set)` pairs, preserving
    /// registration order within each bucket.
    pub(crate) fn build<'a>(
        interests: impl Iterator<Item = (usize, &'a [NodeKind])>,
    ) -> Self {
        let mut buckets: BTreeMap<NodeKind, Vec<usize>> = BTreeMap::new();
        for (index, kinds) in interests {
            for kind in kinds {
                buckets.entry(*kind).or_default().push(index);
            }
        }
        Self { buckets }
    }

    /// Rule indices interested in a node kind, in registration order.
    pub(crate) fn interested(&self, kind: NodeKind) -> &[usize] {
        self.buckets.get(&kind).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_only_to_interested_rules() {
        let a: &[NodeKind] = &[NodeKind::CallExpr, NodeKind::VarDecl];
        let b: &[NodeKind] = &[NodeKind::CallExpr];
        let registry = Registry::build([(0, a), (1, b)].into_iter());

        assert_eq!(registry.interested(NodeKind::CallExpr), &[0, 1]);
        assert_eq!(registry.interested(NodeKind::VarDecl), &[0]);
        assert!(registry.interested(NodeKind::TryStmt).is_empty());
    }

    #[test]
    fn preserves_registration_order() {
        let kinds: &[NodeKind] = &[NodeKind::Identifier];
        let registry = Registry::build([(2, kinds), (0, kinds), (1, kinds)].into_iter());
        assert_eq!(registry.interested(NodeKind::Identifier), &[2, 0, 1]);
    }
}
