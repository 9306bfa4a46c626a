//! Rule to flag queries built from unescaped dynamic strings.
//!
//! # Rationale
//!
//! Interpolating or concatenating runtime values into a query string passed
//! to a query-execution call is the classic injection vector (CWE-89). The
//! dynamic segment must go through a trusted escaping function, or the
//! query must use placeholders handled by the driver.
//!
//! # Detected Patterns
//!
//! ```ignore
//! // BAD: interpolated value
//! db.query(`SELECT * FROM t WHERE id = ${userId}`);
//!
//! // BAD: concatenated value, also via a one-step local binding
//! let sql = "SELECT * FROM t WHERE id = " + userId;
//! db.query(sql);
//! ```
//!
//! # Good Patterns
//!
//! ```ignore
//! // GOOD: escaped through an allowlisted function
//! db.query(`SELECT * FROM t WHERE id = ${escape(userId)}`);
//!
//! // GOOD: fully literal query
//! db.query("SELECT * FROM t");
//! ```
//!
//! With `allow_dynamic_identifiers = true`, a dynamic segment directly
//! after a table- or column-position keyword (`FROM`, `JOIN`, `UPDATE`,
//! `INTO`, `TABLE`) is tolerated; interpolated values always fail
//! regardless of that flag.

use std::any::Any;

use treelint_core::{
    Descriptor, Finding, Message, NodeId, NodeKind, OptionSchema, OptionSpec, Role, Rule,
    RuleContext, Severity, SourceTree, ValueKind,
};

/// Rule code for no-string-queries.
pub const CODE: &str = "TL003";

/// Rule name for no-string-queries.
pub const NAME: &str = "no-string-queries";

const DEFAULT_QUERY_METHODS: &[&str] = &["query", "execute", "raw"];
const DEFAULT_TRUSTED_ESCAPERS: &[&str] = &["escape", "escapeId", "sqlEscape"];

/// Keywords that put the following segment in identifier position.
const IDENTIFIER_KEYWORDS: &[&str] = &["from", "join", "update", "into", "table"];

const SCHEMA: OptionSchema = OptionSchema::new(&[
    OptionSpec {
        name: "query_methods",
        kind: ValueKind::StringArray,
        default: "[\"query\", \"execute\", \"raw\"]",
    },
    OptionSpec {
        name: "trusted_escapers",
        kind: ValueKind::StringArray,
        default: "[\"escape\", \"escapeId\", \"sqlEscape\"]",
    },
    OptionSpec {
        name: "allow_dynamic_identifiers",
        kind: ValueKind::Bool,
        default: "false",
    },
]);

/// One dynamic piece of a string-built query, with the literal text that
/// precedes it.
struct DynamicSegment {
    node: NodeId,
    leading: Option<String>,
}

/// Flags query arguments assembled from unescaped dynamic strings.
#[derive(Debug, Clone)]
pub struct NoStringQueries {
    /// Custom severity.
    pub severity: Severity,
}

impl Default for NoStringQueries {
    fn default() -> Self {
        Self::new()
    }
}

impl NoStringQueries {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl Rule for NoStringQueries {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            code: CODE,
            id: NAME,
            description: "Flags query strings assembled from unescaped dynamic input",
            default_severity: self.severity,
            schema: SCHEMA,
            interests: &[NodeKind::CallExpr],
            fixable: false,
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, _state: &mut dyn Any) -> Vec<Finding> {
        let tree = ctx.tree();
        let Some(method) = callee_name(tree, node) else {
            return Vec::new();
        };
        let options = ctx.options();
        let methods = options
            .get_str_array("query_methods")
            .unwrap_or_else(|| to_strings(DEFAULT_QUERY_METHODS));
        if !methods.iter().any(|m| m == method) {
            return Vec::new();
        }
        let Some(&query_arg) = tree.children(node, Role::Args).first() else {
            return Vec::new();
        };

        let value = resolve_value(ctx, query_arg);
        let segments = dynamic_segments(tree, value);
        if segments.is_empty() {
            return Vec::new();
        }

        let escapers = options
            .get_str_array("trusted_escapers")
            .unwrap_or_else(|| to_strings(DEFAULT_TRUSTED_ESCAPERS));
        let allow_identifiers = options.get_bool("allow_dynamic_identifiers", false);

        let offending = segments.iter().any(|segment| {
            if is_trusted_escape(tree, segment.node, &escapers) {
                return false;
            }
            !(allow_identifiers && in_identifier_position(segment))
        });
        if !offending {
            return Vec::new();
        }

        vec![ctx.finding(
            tree.span(value),
            Message::new(
                "security",
                format!("query passed to `{method}` is built from unescaped dynamic input"),
            )
            .with_reference("CWE-89"),
        )]
    }
}

fn to_strings(defaults: &[&str]) -> Vec<String> {
    defaults.iter().map(ToString::to_string).collect()
}

fn callee_name(tree: &SourceTree, call: NodeId) -> Option<&str> {
    let callee = tree.child(call, Role::Callee)?;
    match tree.kind(callee) {
        NodeKind::Identifier => tree.text(callee),
        NodeKind::MemberExpr => tree.text(tree.child(callee, Role::Property)?),
        _ => None,
    }
}

/// Follows one level of local binding: an identifier argument resolves to
/// its declarator's initializer when the index knows the declaration.
fn resolve_value(ctx: &RuleContext<'_>, arg: NodeId) -> NodeId {
    let tree = ctx.tree();
    if tree.kind(arg) != NodeKind::Identifier {
        return arg;
    }
    let Some(resolution) = ctx.scopes().resolution(arg) else {
        return arg;
    };
    let Some(declarator) = tree.parent(resolution.declaration) else {
        return arg;
    };
    if tree.kind(declarator) != NodeKind::Declarator {
        return arg;
    }
    tree.child(declarator, Role::Init).unwrap_or(arg)
}

/// Dynamic pieces of a template literal or string concatenation; empty when
/// the value is not string-built or is fully literal.
fn dynamic_segments(tree: &SourceTree, value: NodeId) -> Vec<DynamicSegment> {
    match tree.kind(value) {
        NodeKind::TemplateLit => {
            let mut segments = Vec::new();
            let mut leading: Option<String> = None;
            for part in tree.children(value, Role::Parts) {
                if tree.kind(*part) == NodeKind::TemplateChunk {
                    leading = tree.text(*part).map(String::from);
                } else {
                    segments.push(DynamicSegment {
                        node: *part,
                        leading: leading.take(),
                    });
                }
            }
            segments
        }
        NodeKind::BinaryExpr => {
            let mut operands = Vec::new();
            flatten_concat(tree, value, &mut operands);
            if !operands
                .iter()
                .any(|o| matches!(tree.kind(*o), NodeKind::StringLit | NodeKind::TemplateLit))
            {
                // Without a literal string operand this is arithmetic, not
                // query assembly.
                return Vec::new();
            }
            let mut segments = Vec::new();
            let mut leading: Option<String> = None;
            for operand in operands {
                match tree.kind(operand) {
                    NodeKind::StringLit => leading = tree.text(operand).map(String::from),
                    NodeKind::NumberLit => {}
                    NodeKind::TemplateLit => {
                        segments.extend(dynamic_segments(tree, operand));
                        leading = None;
                    }
                    _ => segments.push(DynamicSegment {
                        node: operand,
                        leading: leading.take(),
                    }),
                }
            }
            segments
        }
        _ => Vec::new(),
    }
}

fn flatten_concat(tree: &SourceTree, node: NodeId, out: &mut Vec<NodeId>) {
    if tree.kind(node) == NodeKind::BinaryExpr {
        if let Some(left) = tree.child(node, Role::Left) {
            flatten_concat(tree, left, out);
        }
        if let Some(right) = tree.child(node, Role::Right) {
            flatten_concat(tree, right, out);
        }
    } else {
        out.push(node);
    }
}

/// A segment is trusted when it is a call to an allowlisted escaping
/// function.
fn is_trusted_escape(tree: &SourceTree, segment: NodeId, escapers: &[String]) -> bool {
    if tree.kind(segment) != NodeKind::CallExpr {
        return false;
    }
    callee_name(tree, segment).is_some_and(|name| escapers.iter().any(|e| e == name))
}

/// Whether the literal text before the segment ends in a keyword that
/// takes a table or column name.
fn in_identifier_position(segment: &DynamicSegment) -> bool {
    let Some(leading) = &segment.leading else {
        return false;
    };
    leading
        .split_whitespace()
        .last()
        .is_some_and(|word| IDENTIFIER_KEYWORDS.contains(&word.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use treelint_core::{fixture, Config, Linter, PassResult, RuleSettings};

    fn run(source: &str) -> PassResult {
        run_with(source, Config::new())
    }

    fn run_with(source: &str, config: Config) -> PassResult {
        let tree = fixture::parse(source).expect("fixture parses");
        let linter = Linter::builder()
            .rule(NoStringQueries::new())
            .config(config)
            .build()
            .expect("linter builds");
        linter.run(&tree)
    }

    #[test]
    fn flags_interpolated_value() {
        let result = run("db.query(`SELECT * FROM t WHERE id = ${userId}`);");
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.rule, NAME);
        assert_eq!(finding.message.reference.as_deref(), Some("CWE-89"));
    }

    #[test]
    fn trusted_escaper_satisfies() {
        let result = run("db.query(`SELECT * FROM t WHERE id = ${escape(userId)}`);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn literal_query_is_fine() {
        let result = run("db.query('SELECT * FROM t');");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn flags_concatenated_value() {
        let result = run("db.execute('SELECT * FROM t WHERE id = ' + userId);");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn traces_one_binding_step() {
        let result = run(
            "let sql = `SELECT * FROM t WHERE id = ${userId}`; db.query(sql);",
        );
        assert_eq!(result.findings.len(), 1);
        // The finding points at the construction expression.
        assert_eq!(result.findings[0].line, 1);
    }

    #[test]
    fn dynamic_identifier_flag_tolerates_table_position() {
        let source = "db.query(`SELECT * FROM ${table} WHERE id = 1`);";
        assert_eq!(run(source).findings.len(), 1);

        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option("allow_dynamic_identifiers", true),
        );
        assert!(run_with(source, config).findings.is_empty());
    }

    #[test]
    fn values_fail_even_with_identifier_flag() {
        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option("allow_dynamic_identifiers", true),
        );
        let result = run_with(
            "db.query(`SELECT * FROM ${table} WHERE id = ${userId}`);",
            config,
        );
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn configured_escapers_replace_defaults() {
        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option("trusted_escapers", vec!["sanitize".to_string()]),
        );
        let result = run_with(
            "db.query(`SELECT * FROM t WHERE id = ${sanitize(userId)}`);",
            config,
        );
        assert!(result.findings.is_empty());
    }

    #[test]
    fn arithmetic_concatenation_is_ignored() {
        let result = run("db.execute(a + b);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn non_query_methods_are_ignored() {
        let result = run("log.query; db.fetchAll(`${userId}`);");
        assert!(result.findings.is_empty());
    }
}
