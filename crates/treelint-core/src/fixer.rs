//! Fix reconciliation: merges fixes from all findings into one consistent
//! set of non-overlapping edits and applies them to the original source.

use tracing::debug;

use crate::finding::{Finding, Fix};
use crate::tree::Span;

/// Result of reconciling the fixes of one pass.
#[derive(Debug)]
pub(crate) struct FixOutcome {
    /// Rewritten source after applying accepted fixes.
    pub(crate) source: String,
    /// Indices (into the findings slice) whose fix was applied.
    pub(crate) applied: Vec<usize>,
    /// Indices whose fix was dropped because it overlapped an accepted one.
    pub(crate) conflicted: Vec<usize>,
}

/// Reconciles and applies fixes.
///
/// Findings arrive sorted by span start then rule id, so acceptance order
/// (and therefore conflict resolution) is reproducible across runs. A fix is
/// accepted only if none of its edits overlap an already-accepted edit;
/// otherwise the whole fix is dropped and recorded as conflicted. Edits are
/// computed against original offsets and applied in one left-to-right walk
/// with a cursor, so no offset re-computation happens mid-walk.
pub(crate) fn apply(source: &str, findings: &[Finding]) -> FixOutcome {
    let candidates: Vec<(usize, &Fix)> = findings
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.fix.as_ref().map(|fix| (i, fix)))
        .collect();

    let mut accepted_spans: Vec<Span> = Vec::new();
    let mut applied = Vec::new();
    let mut conflicted = Vec::new();

    for (index, fix) in candidates {
        let conflicts = fix
            .edits()
            .iter()
            .any(|e| accepted_spans.iter().any(|s| s.overlaps(e.span)));
        if conflicts {
            conflicted.push(index);
        } else {
            accepted_spans.extend(fix.edits().iter().map(|e| e.span));
            applied.push(index);
        }
    }

    let mut edits: Vec<_> = applied
        .iter()
        .flat_map(|i| {
            findings[*i]
                .fix
                .as_ref()
                .map_or(&[][..], Fix::edits)
                .iter()
        })
        .collect();
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut rewritten = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        rewritten.push_str(source.get(cursor..edit.span.start).unwrap_or(""));
        rewritten.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    rewritten.push_str(source.get(cursor..).unwrap_or(""));

    debug!(
        applied = applied.len(),
        conflicted = conflicted.len(),
        "fixes reconciled"
    );

    FixOutcome {
        source: rewritten,
        applied,
        conflicted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Edit, Message, Severity};

    fn finding_with_fix(span: Span, replacement: &str) -> Finding {
        Finding::new(
            "test-rule",
            "T001",
            Severity::Warn,
            span,
            1,
            span.start + 1,
            Message::new("style", "test"),
        )
        .with_fix(Fix::single(span, replacement))
    }

    #[test]
    fn applies_disjoint_fixes_in_offset_order() {
        let source = "var a; var b;";
        let findings = vec![
            finding_with_fix(Span::new(0, 3), "let"),
            finding_with_fix(Span::new(7, 10), "let"),
        ];
        let outcome = apply(source, &findings);
        assert_eq!(outcome.source, "let a; let b;");
        assert_eq!(outcome.applied, vec![0, 1]);
        assert!(outcome.conflicted.is_empty());
    }

    #[test]
    fn drops_later_overlapping_fix() {
        let source = "abcdef";
        let findings = vec![
            finding_with_fix(Span::new(0, 4), "XXXX"),
            finding_with_fix(Span::new(3, 6), "YYY"),
        ];
        let outcome = apply(source, &findings);
        assert_eq!(outcome.source, "XXXXef");
        assert_eq!(outcome.applied, vec![0]);
        assert_eq!(outcome.conflicted, vec![1]);
    }

    #[test]
    fn adjacent_fixes_do_not_conflict() {
        let source = "abcd";
        let findings = vec![
            finding_with_fix(Span::new(0, 2), "12"),
            finding_with_fix(Span::new(2, 4), "34"),
        ];
        let outcome = apply(source, &findings);
        assert_eq!(outcome.source, "1234");
        assert_eq!(outcome.applied, vec![0, 1]);
    }

    #[test]
    fn multi_edit_fix_is_atomic() {
        let source = "abcdef";
        let multi = Finding::new(
            "test-rule",
            "T001",
            Severity::Warn,
            Span::new(0, 6),
            1,
            1,
            Message::new("style", "test"),
        )
        .with_fix(
            Fix::with_edits(vec![
                Edit::new(Span::new(0, 1), "X"),
                Edit::new(Span::new(4, 5), "Y"),
            ])
            .expect("disjoint"),
        );
        // Overlaps only the second edit of the multi-edit fix, but the
        // whole fix must be dropped.
        let findings = vec![finding_with_fix(Span::new(3, 5), "ZZ"), multi];
        let outcome = apply(source, &findings);
        assert_eq!(outcome.source, "abcZZf");
        assert_eq!(outcome.applied, vec![0]);
        assert_eq!(outcome.conflicted, vec![1]);
    }

    #[test]
    fn findings_without_fixes_are_ignored() {
        let source = "abc";
        let findings = vec![Finding::new(
            "test-rule",
            "T001",
            Severity::Error,
            Span::new(0, 3),
            1,
            1,
            Message::new("style", "test"),
        )];
        let outcome = apply(source, &findings);
        assert_eq!(outcome.source, source);
        assert!(outcome.applied.is_empty());
        assert!(outcome.conflicted.is_empty());
    }
}
