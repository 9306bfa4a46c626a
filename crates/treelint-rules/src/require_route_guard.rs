//! Rule to require an authentication or CSRF guard on route registrations.
//!
//! # Rationale
//!
//! A route handler registered without a guard middleware argument, and
//! without a global guard installed earlier in the same file, accepts
//! unauthenticated state-changing requests.
//!
//! # Detected Patterns
//!
//! ```ignore
//! // BAD: no guard argument, no prior global guard
//! app.post('/api/users', (req, res) => { create(req, res); });
//! ```
//!
//! # Good Patterns
//!
//! ```ignore
//! // GOOD: per-route guard argument
//! app.post('/api/users', authenticate, handler);
//!
//! // GOOD: global guard installed before the route
//! app.use(csrf());
//! app.post('/api/users', handler);
//! ```
//!
//! Ordering matters: a global installation is only satisfying when it
//! appears at module level, lexically before the route registration. Either
//! a per-route argument or an earlier global installation satisfies the
//! check on its own.

use std::any::Any;

use tracing::debug;
use treelint_core::{
    Descriptor, Finding, Message, NodeId, NodeKind, OptionSchema, OptionSpec, Role, Rule,
    RuleContext, Severity, SourceTree, ValueKind,
};

/// Rule code for require-route-guard.
pub const CODE: &str = "TL002";

/// Rule name for require-route-guard.
pub const NAME: &str = "require-route-guard";

const DEFAULT_ROUTER_NAMES: &[&str] = &["app", "router"];
const DEFAULT_ROUTE_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "all"];
const DEFAULT_GUARD_PATTERNS: &[&str] = &["authenticate", "requireAuth", "csrf", "csrfProtection"];

const SCHEMA: OptionSchema = OptionSchema::new(&[
    OptionSpec {
        name: "router_names",
        kind: ValueKind::StringArray,
        default: "[\"app\", \"router\"]",
    },
    OptionSpec {
        name: "route_methods",
        kind: ValueKind::StringArray,
        default: "[\"get\", \"post\", \"put\", \"delete\", \"patch\", \"all\"]",
    },
    OptionSpec {
        name: "guard_patterns",
        kind: ValueKind::StringArray,
        default: "[\"authenticate\", \"requireAuth\", \"csrf\", \"csrfProtection\"]",
    },
    OptionSpec {
        name: "global_install_method",
        kind: ValueKind::String,
        default: "\"use\"",
    },
]);

/// Per-pass memory: has a global guard installation been seen yet.
#[derive(Debug, Default)]
struct GuardState {
    global_guard_seen: bool,
}

/// Requires route registrations to carry a guard middleware argument or be
/// preceded by a global guard installation.
#[derive(Debug, Clone)]
pub struct RequireRouteGuard {
    /// Custom severity.
    pub severity: Severity,
}

impl Default for RequireRouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RequireRouteGuard {
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

impl Rule for RequireRouteGuard {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            code: CODE,
            id: NAME,
            description: "Requires an authentication or CSRF guard on route registrations",
            default_severity: self.severity,
            schema: SCHEMA,
            interests: &[NodeKind::CallExpr],
            fixable: false,
        }
    }

    fn begin_pass(&self) -> Box<dyn Any> {
        Box::new(GuardState::default())
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, state: &mut dyn Any) -> Vec<Finding> {
        let tree = ctx.tree();
        let Some((receiver, method)) = method_call(tree, node) else {
            return Vec::new();
        };
        let Some(state) = state.downcast_mut::<GuardState>() else {
            return Vec::new();
        };

        let options = ctx.options();
        let routers = options
            .get_str_array("router_names")
            .unwrap_or_else(|| to_strings(DEFAULT_ROUTER_NAMES));
        if !routers.iter().any(|r| r == receiver) {
            return Vec::new();
        }
        let patterns = options
            .get_str_array("guard_patterns")
            .unwrap_or_else(|| to_strings(DEFAULT_GUARD_PATTERNS));

        // Global installation shape: `app.use(csrf())` and the like. The
        // traversal is a single left-to-right pass, so only installations
        // lexically before a route registration can satisfy it. An install
        // inside a function body may never execute and does not count.
        if method == options.get_str("global_install_method", "use") {
            if ctx.control(node).enclosing_fn.is_none() {
                let args = tree.children(node, Role::Args);
                if args.iter().any(|a| matches_guard(tree, *a, &patterns)) {
                    state.global_guard_seen = true;
                    debug!(rule = NAME, "global guard installation observed");
                }
            }
            return Vec::new();
        }

        let methods = options
            .get_str_array("route_methods")
            .unwrap_or_else(|| to_strings(DEFAULT_ROUTE_METHODS));
        if !methods.iter().any(|m| m == method) {
            return Vec::new();
        }

        if state.global_guard_seen {
            return Vec::new();
        }
        let args = tree.children(node, Role::Args);
        let middleware_args = &args[..args.len().saturating_sub(1)];
        if middleware_args
            .iter()
            .any(|a| matches_guard(tree, *a, &patterns))
        {
            return Vec::new();
        }

        vec![ctx.finding(
            tree.span(node),
            Message::new(
                "security",
                format!(
                    "route `{receiver}.{method}` is registered without an authentication or CSRF guard"
                ),
            )
            .with_reference("CWE-352"),
        )]
    }
}

fn to_strings(defaults: &[&str]) -> Vec<String> {
    defaults.iter().map(ToString::to_string).collect()
}

/// `receiver.method(...)` where the receiver is a plain identifier.
fn method_call(tree: &SourceTree, call: NodeId) -> Option<(&str, &str)> {
    let callee = tree.child(call, Role::Callee)?;
    if tree.kind(callee) != NodeKind::MemberExpr {
        return None;
    }
    let object = tree.child(callee, Role::Object)?;
    if tree.kind(object) != NodeKind::Identifier {
        return None;
    }
    let receiver = tree.text(object)?;
    let method = tree.text(tree.child(callee, Role::Property)?)?;
    Some((receiver, method))
}

/// Whether an argument names or calls a configured guard: `authenticate`,
/// `csrf()`, or `auth.requireAuth` and the called forms thereof.
fn matches_guard(tree: &SourceTree, arg: NodeId, patterns: &[String]) -> bool {
    let named = |id: NodeId| {
        tree.text(id)
            .is_some_and(|name| patterns.iter().any(|p| p == name))
    };
    match tree.kind(arg) {
        NodeKind::Identifier => named(arg),
        NodeKind::MemberExpr => tree.child(arg, Role::Property).is_some_and(named),
        NodeKind::CallExpr => tree
            .child(arg, Role::Callee)
            .is_some_and(|callee| matches_guard(tree, callee, patterns)),
        _ => false,
    }
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
            .rule(RequireRouteGuard::new())
            .config(config)
            .build()
            .expect("linter builds");
        linter.run(&tree)
    }

    #[test]
    fn flags_unguarded_route() {
        let source = "app.post('/api/users', (req, res) => { create(req, res); });";
        let result = run(source);
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.rule, NAME);
        assert_eq!(finding.message.reference.as_deref(), Some("CWE-352"));
        assert_eq!(&source[finding.span.start..finding.span.end], &source[..source.len() - 1]);
    }

    #[test]
    fn guard_argument_satisfies() {
        let result = run("app.post('/api/users', authenticate, handler);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn called_guard_argument_satisfies() {
        let result = run("app.post('/api/users', csrfProtection(), handler);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn earlier_global_guard_satisfies() {
        let result = run("app.use(csrf()); app.post('/api/users', handler);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn later_global_guard_does_not_satisfy() {
        let result = run("app.post('/api/users', handler); app.use(csrf());");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn global_guard_inside_a_function_does_not_satisfy() {
        // The install only runs if `setup` is ever called.
        let result = run("function setup() { app.use(csrf()); } app.post('/x', handler);");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].rule, NAME);
    }

    #[test]
    fn unguarded_global_install_does_not_satisfy() {
        let result = run("app.use(logger()); app.post('/api/users', handler);");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn unknown_receiver_is_ignored() {
        let result = run("client.post('/api/users', handler);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn configured_router_names_apply() {
        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option("router_names", vec!["server".to_string()]),
        );
        let result = run_with("server.post('/x', handler);", config);
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn configured_guard_patterns_apply() {
        let config = Config::new().with_rule(
            NAME,
            RuleSettings::new().option("guard_patterns", vec!["withSession".to_string()]),
        );
        let result = run_with("app.post('/x', withSession, handler);", config);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn final_handler_argument_is_not_a_guard_position() {
        // Even if the last argument matched a pattern name it is the
        // handler, not a middleware argument.
        let result = run("app.post('/x', authenticate);");
        assert_eq!(result.findings.len(), 1);
    }
}
