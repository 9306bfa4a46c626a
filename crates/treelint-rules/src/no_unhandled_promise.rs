//! Rule to flag promise-returning calls whose failure is never observed.
//!
//! # Rationale
//!
//! A rejected promise whose result is discarded surfaces as an unhandled
//! rejection at runtime, far from the call that caused it. The call must
//! either be awaited, given a chained rejection handler, or explicitly
//! discarded with `void` (configurable).
//!
//! # Detected Patterns
//!
//! ```ignore
//! // BAD: result discarded in a non-async function
//! function handler(userId) {
//!     fetchUserData(userId);
//! }
//! ```
//!
//! # Good Patterns
//!
//! ```ignore
//! // GOOD: awaited
//! await fetchUserData(userId);
//!
//! // GOOD: chained rejection handler
//! fetchUserData(userId).catch(onErr);
//!
//! // GOOD: explicitly discarded (with allow_void = true, the default)
//! void fetchUserData(userId);
//! ```

use std::any::Any;

use treelint_core::{
    Descriptor, Finding, Fix, Message, NodeId, NodeKind, OptionSchema, OptionSpec, Role, Rule,
    RuleContext, Severity, SourceTree, Span, Suggestion, ValueKind,
};

/// Rule code for no-unhandled-promise.
pub const CODE: &str = "TL001";

/// Rule name for no-unhandled-promise.
pub const NAME: &str = "no-unhandled-promise";

/// Callee base names treated as promise-returning when not configured.
const DEFAULT_PROMISE_FUNCTIONS: &[&str] = &["fetch"];

const SCHEMA: OptionSchema = OptionSchema::new(&[
    OptionSpec {
        name: "promise_functions",
        kind: ValueKind::StringArray,
        default: "[\"fetch\"]",
    },
    OptionSpec {
        name: "allow_void",
        kind: ValueKind::Bool,
        default: "true",
    },
]);

/// Flags promise-returning calls that are neither awaited nor given a
/// rejection handler.
#[derive(Debug, Clone)]
pub struct NoUnhandledPromise {
    /// Custom severity.
    pub severity: Severity,
}

impl Default for NoUnhandledPromise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoUnhandledPromise {
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

impl Rule for NoUnhandledPromise {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            code: CODE,
            id: NAME,
            description: "Flags promise-returning calls whose rejection is never handled",
            default_severity: self.severity,
            schema: SCHEMA,
            interests: &[NodeKind::CallExpr],
            fixable: false,
        }
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, _state: &mut dyn Any) -> Vec<Finding> {
        let tree = ctx.tree();
        let Some(name) = callee_base_name(tree, node) else {
            return Vec::new();
        };

        let configured = ctx.options().get_str_array("promise_functions");
        let bases: Vec<&str> = match &configured {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => DEFAULT_PROMISE_FUNCTIONS.to_vec(),
        };
        let is_promise =
            name.ends_with("Async") || bases.iter().any(|base| matches_base(name, base));
        if !is_promise {
            return Vec::new();
        }

        // Handled forms, in priority order: awaited, chained `.catch`,
        // awaited later inside the enclosing try region via a binding.
        if has_enclosing(tree, node, NodeKind::AwaitExpr) {
            return Vec::new();
        }
        if chain_has_rejection_handler(tree, node) {
            return Vec::new();
        }
        if ctx.options().get_bool("allow_void", true)
            && has_enclosing(tree, node, NodeKind::VoidExpr)
        {
            return Vec::new();
        }
        if let Some(try_stmt) = ctx.control(node).enclosing_try {
            if awaited_later_in_try(ctx, node, try_stmt) {
                return Vec::new();
            }
        }

        // Only a bare, discarded call outside an async function is flagged;
        // results bound to variables or returned are outside this pattern.
        let top = chain_top(tree, node);
        if !ctx.control(top).is_discarded || ctx.control(node).in_async_fn {
            return Vec::new();
        }

        let span = tree.span(node);
        let finding = ctx
            .finding(
                span,
                Message::new(
                    "correctness",
                    format!("result of promise-returning call `{name}` is never handled"),
                ),
            )
            .with_suggestion(Suggestion::new(
                "await the call inside an async function, or chain `.catch(...)`",
                Fix::single(Span::new(span.start, span.start), "await "),
            ));
        vec![finding]
    }
}

/// Name the callee is known by: the identifier itself, or the final member
/// property for method calls.
fn callee_base_name(tree: &SourceTree, call: NodeId) -> Option<&str> {
    let callee = tree.child(call, Role::Callee)?;
    match tree.kind(callee) {
        NodeKind::Identifier => tree.text(callee),
        NodeKind::MemberExpr => tree.text(tree.child(callee, Role::Property)?),
        _ => None,
    }
}

/// `fetch` matches `fetch` itself and camel-case extensions like
/// `fetchUserData`, but not `fetched`.
fn matches_base(name: &str, base: &str) -> bool {
    name == base
        || name
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with(char::is_uppercase))
}

/// Whether any enclosing expression node up to the statement boundary has
/// the given kind.
fn has_enclosing(tree: &SourceTree, node: NodeId, kind: NodeKind) -> bool {
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        let parent_kind = tree.kind(parent);
        if parent_kind == kind {
            return true;
        }
        match parent_kind {
            NodeKind::MemberExpr
            | NodeKind::CallExpr
            | NodeKind::BinaryExpr
            | NodeKind::AwaitExpr
            | NodeKind::VoidExpr => current = parent,
            _ => return false,
        }
    }
    false
}

/// Follows a `call.member(...).member(...)` chain upward looking for a
/// `.catch(...)` link before the chain ends.
fn chain_has_rejection_handler(tree: &SourceTree, call: NodeId) -> bool {
    let mut current = call;
    loop {
        let Some((member, outer_call)) = chain_link(tree, current) else {
            return false;
        };
        let property = tree.child(member, Role::Property).and_then(|p| tree.text(p));
        if property == Some("catch") {
            return true;
        }
        current = outer_call;
    }
}

/// Topmost expression of the member chain this call belongs to, stepping
/// through a wrapping `void` as well.
fn chain_top(tree: &SourceTree, call: NodeId) -> NodeId {
    let mut top = call;
    loop {
        if let Some((_, outer_call)) = chain_link(tree, top) {
            top = outer_call;
            continue;
        }
        match tree.parent(top) {
            Some(parent) if tree.kind(parent) == NodeKind::VoidExpr => top = parent,
            _ => return top,
        }
    }
}

/// If `node` is the object of a member expression that is itself called,
/// returns `(member, outer call)`.
fn chain_link(tree: &SourceTree, node: NodeId) -> Option<(NodeId, NodeId)> {
    let member = tree.parent(node)?;
    if tree.kind(member) != NodeKind::MemberExpr || tree.role(node) != Some(Role::Object) {
        return None;
    }
    let outer = tree.parent(member)?;
    if tree.kind(outer) == NodeKind::CallExpr && tree.role(member) == Some(Role::Callee) {
        Some((member, outer))
    } else {
        None
    }
}

/// Whether the call result is bound to a name that is awaited later inside
/// the try block the call sits in.
fn awaited_later_in_try(ctx: &RuleContext<'_>, call: NodeId, try_stmt: NodeId) -> bool {
    let tree = ctx.tree();
    let Some(declarator) = tree.parent(call) else {
        return false;
    };
    if tree.kind(declarator) != NodeKind::Declarator || tree.role(call) != Some(Role::Init) {
        return false;
    }
    let Some(name_node) = tree.child(declarator, Role::Name) else {
        return false;
    };
    let Some(name) = tree.text(name_node) else {
        return false;
    };
    let Some(block) = tree.child(try_stmt, Role::TryBlock) else {
        return false;
    };
    let region = tree.span(block);

    let scope = ctx.scope_of(name_node);
    let Some(resolution) = ctx.scopes().resolve(scope, name) else {
        return false;
    };
    let Some(binding) = ctx.scopes().scope(resolution.scope).binding(name) else {
        return false;
    };
    binding
        .references
        .iter()
        .any(|r| region.contains(tree.span(*r)) && has_enclosing(tree, *r, NodeKind::AwaitExpr))
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
            .rule(NoUnhandledPromise::new())
            .config(config)
            .build()
            .expect("linter builds");
        linter.run(&tree)
    }

    #[test]
    fn flags_discarded_call_in_sync_function() {
        let result = run("function handler(userId) { fetchUserData(userId); }");
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.rule, NAME);
        assert!(finding.fix.is_none());
        assert_eq!(finding.suggestions.len(), 1);
    }

    #[test]
    fn finding_span_covers_the_call() {
        let source = "function handler(userId) { fetchUserData(userId); }";
        let result = run(source);
        let span = result.findings[0].span;
        assert_eq!(&source[span.start..span.end], "fetchUserData(userId)");
    }

    #[test]
    fn allows_chained_catch() {
        let result = run("fetchUserData(userId).catch(onErr);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn flags_then_without_catch() {
        let result = run("fetchUserData(userId).then(render);");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn allows_catch_after_then() {
        let result = run("fetchUserData(userId).then(render).catch(onErr);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn allows_awaited_call() {
        let result = run("async function load(id) { await fetchUserData(id); }");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn ignores_discard_inside_async_function() {
        let result = run("async function load(id) { fetchUserData(id); }");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn void_discard_is_configurable() {
        let source = "function f(id) { void fetchUserData(id); }";
        assert!(run(source).findings.is_empty());

        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option("allow_void", false),
        );
        assert_eq!(run_with(source, config).findings.len(), 1);
    }

    #[test]
    fn async_suffix_is_recognized() {
        let result = run("function f() { saveAsync(); }");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn configured_names_replace_defaults() {
        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option(
                "promise_functions",
                vec!["loadUser".to_string()],
            ),
        );
        let result = run_with("function f(id) { loadUser(id); fetchUserData(id); }", config);
        assert_eq!(result.findings.len(), 1);
        let span = result.findings[0].span;
        assert_eq!(span.start, "function f(id) { ".len());
    }

    #[test]
    fn binding_awaited_inside_try_is_handled() {
        let result = run(
            "function f() { try { let p = fetchUserData(1); await p; } catch (e) { log(e); } }",
        );
        assert!(result.findings.is_empty());
    }

    #[test]
    fn bound_result_is_outside_the_pattern() {
        let result = run("function f() { let p = fetchUserData(1); use(p); }");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn unrelated_calls_are_ignored() {
        let result = run("function f() { render(); console.log('x'); }");
        assert!(result.findings.is_empty());
    }
}
