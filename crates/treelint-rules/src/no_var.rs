//! Rule to replace `var` declarations with block-scoped `let`.
//!
//! # Rationale
//!
//! `var` hoists to the enclosing function and silently tolerates
//! redeclaration, which is a recurring source of stale-state bugs. The rule
//! carries an automatic fix rewriting the keyword to `let`.

use std::any::Any;

use treelint_core::{
    Descriptor, Finding, Fix, Message, NodeId, NodeKind, OptionSchema, Rule, RuleContext,
    Severity, Span,
};

/// Rule code for no-var.
pub const CODE: &str = "TL004";

/// Rule name for no-var.
pub const NAME: &str = "no-var";

/// Forbids `var` declarations in favor of `let`.
#[derive(Debug, Clone)]
pub struct NoVar {
    /// Custom severity.
    pub severity: Severity,
}

impl Default for NoVar {
    fn default() -> Self {
        Self::new()
    }
}

impl NoVar {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Warn,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl Rule for NoVar {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            code: CODE,
            id: NAME,
            description: "Forbids `var` declarations in favor of block-scoped `let`",
            default_severity: self.severity,
            schema: OptionSchema::EMPTY,
            interests: &[NodeKind::VarDecl],
            fixable: true,
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, _state: &mut dyn Any) -> Vec<Finding> {
        let tree = ctx.tree();
        if tree.text(node) != Some("var") {
            return Vec::new();
        }
        let span = tree.span(node);
        let keyword = Span::new(span.start, span.start + 3);
        if tree.snippet(keyword) != "var" {
            return Vec::new();
        }

        vec![ctx
            .finding(
                span,
                Message::new("style", "`var` declaration; use `let` or `const`"),
            )
            .with_fix(Fix::single(keyword, "let"))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treelint_core::{fixture, Linter, PassResult};

    fn run(source: &str, fix: bool) -> PassResult {
        let tree = fixture::parse(source).expect("fixture parses");
        let linter = Linter::builder()
            .rule(NoVar::new())
            .fix(fix)
            .build()
            .expect("linter builds");
        linter.run(&tree)
    }

    #[test]
    fn flags_var_declarations() {
        let result = run("var a = 1; let b = 2; const c = 3;", false);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].rule, NAME);
    }

    #[test]
    fn findings_carry_the_rule_code() {
        let result = run("var a = 1;", false);
        assert_eq!(result.findings[0].code, CODE);
        assert!(result.findings[0].to_string().contains("[TL004:no-var]"));
    }

    #[test]
    fn fix_rewrites_keyword_only() {
        let result = run("var a = 1; use(a);", true);
        assert_eq!(result.fixed_source.as_deref(), Some("let a = 1; use(a);"));
    }

    #[test]
    fn fixes_every_declaration() {
        let result = run("var a = 1; var b = 2;", true);
        assert_eq!(result.fixed_source.as_deref(), Some("let a = 1; let b = 2;"));
    }

    #[test]
    fn nested_declarations_are_found() {
        let result = run("function f() { var x = 1; return x; }", false);
        assert_eq!(result.findings.len(), 1);
    }
}
