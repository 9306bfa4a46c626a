//! Diagnostic model: findings, fixes, suggestions, and pass results.

use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};

use crate::tree::Span;

/// Severity of a finding.
///
/// `Off` never appears on an emitted finding; configuring a rule to `off`
/// disables it before the pass starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rule disabled.
    Off,
    /// Reported but does not fail the pass.
    Warn,
    /// Must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity `{other}` (expected off, warn or error)"
            )),
        }
    }
}

/// Structured finding message.
///
/// Carries every field either a plain-text or a machine-readable renderer
/// needs; the engine does not prescribe the rendering format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Short category tag (e.g. `security`, `correctness`, `style`).
    pub kind: String,
    /// Human-readable text.
    pub text: String,
    /// Optional reference identifier, such as a weakness-classification id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            reference: None,
        }
    }

    /// Attaches a reference identifier (e.g. `CWE-89`).
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// One text replacement against the original source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Span to replace, in original-source offsets.
    pub span: Span,
    /// Replacement text.
    pub replacement: String,
}

impl Edit {
    /// Creates a new edit.
    #[must_use]
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// A set of edits the emitting rule claims are safe to apply together.
///
/// Invariant: the edits inside one fix never overlap each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    edits: Vec<Edit>,
}

impl Fix {
    /// Creates a fix with a single edit.
    #[must_use]
    pub fn single(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            edits: vec![Edit::new(span, replacement)],
        }
    }

    /// Creates a fix from several edits, sorted by start offset.
    ///
    /// Returns `None` when two edits overlap; a rule producing such a fix
    /// has a bug and the fix is discarded rather than half-applied.
    #[must_use]
    pub fn with_edits(mut edits: Vec<Edit>) -> Option<Self> {
        edits.sort_by_key(|e| (e.span.start, e.span.end));
        for pair in edits.windows(2) {
            if pair[0].span.overlaps(pair[1].span) {
                return None;
            }
        }
        Some(Self { edits })
    }

    /// The edits of this fix, ordered by start offset.
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }
}

/// A proposed edit that requires human confirmation.
///
/// Never applied automatically, regardless of conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Human-readable label describing the proposal.
    pub label: String,
    /// The edit set to apply on confirmation.
    pub fix: Fix,
}

impl Suggestion {
    /// Creates a new suggestion.
    #[must_use]
    pub fn new(label: impl Into<String>, fix: Fix) -> Self {
        Self {
            label: label.into(),
            fix,
        }
    }
}

/// Outcome of fix reconciliation for one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixStatus {
    /// No fix attached, or fixing was not requested.
    #[default]
    NotApplied,
    /// The fix was accepted and applied to the rewritten source.
    Applied,
    /// The fix overlapped an already-accepted fix and was dropped.
    Conflicted,
}

/// A single reported issue.
///
/// Findings are created during one traversal pass, consumed by the fix
/// applier and the report renderer, and discarded after the pass; they
/// carry no identity across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Identifier of the emitting rule.
    pub rule: String,
    /// Stable short code of the emitting rule (e.g. `TL001`).
    pub code: String,
    /// Resolved severity.
    pub severity: Severity,
    /// Source span the finding covers.
    pub span: Span,
    /// 1-indexed line of the span start.
    pub line: usize,
    /// 1-indexed column of the span start.
    pub column: usize,
    /// Structured message.
    pub message: Message,
    /// Optional automatic fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
    /// Proposed edits requiring confirmation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    /// Whether the fix was applied, dropped, or not attempted.
    #[serde(default)]
    pub fix_status: FixStatus,
}

impl Finding {
    /// Creates a new finding.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
        span: Span,
        line: usize,
        column: usize,
        message: Message,
    ) -> Self {
        Self {
            rule: rule.into(),
            code: code.into(),
            severity,
            span,
            line,
            column,
            message,
            fix: None,
            suggestions: Vec::new(),
            fix_status: FixStatus::NotApplied,
        }
    }

    /// Attaches an automatic fix.
    #[must_use]
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Adds a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {} [{}:{}] {}",
            self.line, self.column, self.severity, self.code, self.rule, self.message.text
        )?;
        if let Some(reference) = &self.message.reference {
            write!(f, " ({reference})")?;
        }
        Ok(())
    }
}

/// Converts a [`Finding`] to a miette diagnostic for rich terminal display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct FindingDiagnostic {
    message: String,
    #[help]
    help: Option<String>,
    #[label("{label}")]
    span: SourceSpan,
    label: String,
}

impl From<&Finding> for FindingDiagnostic {
    fn from(finding: &Finding) -> Self {
        Self {
            message: format!(
                "[{}:{}] {}",
                finding.code, finding.rule, finding.message.text
            ),
            help: finding.suggestions.first().map(|s| s.label.clone()),
            span: SourceSpan::from((finding.span.start, finding.span.len())),
            label: finding.message.kind.clone(),
        }
    }
}

/// Result of one analysis pass over one tree.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PassResult {
    /// Findings ordered by span start, then rule identifier.
    pub findings: Vec<Finding>,
    /// Rewritten source, present when fixing was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_source: Option<String>,
}

impl PassResult {
    /// Returns true if any finding has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Counts findings by severity as `(errors, warnings)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize) {
        let errors = self
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count();
        let warnings = self
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Warn)
            .count();
        (errors, warnings)
    }

    /// Findings emitted by one rule.
    #[must_use]
    pub fn by_rule(&self, rule: &str) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.rule == rule).collect()
    }

    /// Formats a plain-text report.
    #[must_use]
    pub fn format_report(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        for finding in &self.findings {
            let _ = writeln!(report, "{finding}");
            if finding.fix_status == FixStatus::Conflicted {
                let _ = writeln!(report, "  = note: fix not applied due to conflict");
            }
            for suggestion in &finding.suggestions {
                let _ = writeln!(report, "  = help: {}", suggestion.label);
            }
        }
        let (errors, warnings) = self.count_by_severity();
        let _ = writeln!(report, "{errors} error(s), {warnings} warning(s)");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_finding(severity: Severity) -> Finding {
        Finding::new(
            "no-var",
            "TL004",
            severity,
            Span::new(0, 3),
            1,
            1,
            Message::new("style", "`var` declaration"),
        )
    }

    #[test]
    fn severity_round_trips_through_str() {
        for s in [Severity::Off, Severity::Warn, Severity::Error] {
            let parsed: Severity = s.to_string().parse().expect("parses");
            assert_eq!(parsed, s);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn fix_with_overlapping_edits_is_rejected() {
        let edits = vec![
            Edit::new(Span::new(0, 4), "a"),
            Edit::new(Span::new(3, 6), "b"),
        ];
        assert!(Fix::with_edits(edits).is_none());
    }

    #[test]
    fn fix_sorts_disjoint_edits() {
        let fix = Fix::with_edits(vec![
            Edit::new(Span::new(5, 6), "b"),
            Edit::new(Span::new(0, 1), "a"),
        ])
        .expect("disjoint edits");
        assert_eq!(fix.edits()[0].span.start, 0);
    }

    #[test]
    fn display_includes_reference() {
        let mut finding = make_finding(Severity::Error);
        finding.message = finding.message.with_reference("CWE-89");
        insta::assert_snapshot!(
            finding.to_string(),
            @"1:1 error [TL004:no-var] `var` declaration (CWE-89)"
        );
    }

    #[test]
    fn report_marks_conflicted_fixes() {
        let mut result = PassResult::default();
        let mut finding = make_finding(Severity::Warn);
        finding.fix_status = FixStatus::Conflicted;
        result.findings.push(finding);
        let report = result.format_report();
        assert!(report.contains("fix not applied due to conflict"));
        assert!(report.contains("0 error(s), 1 warning(s)"));
    }

    #[test]
    fn serializes_to_machine_readable_payload() {
        let finding = make_finding(Severity::Warn)
            .with_fix(Fix::single(Span::new(0, 3), "let"));
        let value = serde_json::to_value(&finding).expect("serializes");
        assert_eq!(value["rule"], "no-var");
        assert_eq!(value["code"], "TL004");
        assert_eq!(value["severity"], "warn");
        assert_eq!(value["message"]["kind"], "style");
        assert_eq!(value["fix_status"], "not-applied");
    }

    #[test]
    fn counts_by_severity() {
        let mut result = PassResult::default();
        result.findings.push(make_finding(Severity::Error));
        result.findings.push(make_finding(Severity::Warn));
        result.findings.push(make_finding(Severity::Warn));
        assert!(result.has_errors());
        assert_eq!(result.count_by_severity(), (1, 2));
    }
}
