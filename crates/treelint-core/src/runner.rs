//! Run coordinator: orchestrates one analysis pass over one tree.
//!
//! Configuration is validated when the [`Linter`] is built, before any pass
//! starts, so a pass itself either completes with a full finding set
//! (possibly including isolated per-rule failure notices) or never begins.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::config::{Config, RuleSettings};
use crate::control::ControlIndex;
use crate::error::EngineError;
use crate::finding::{FixStatus, Message, PassResult, Severity};
use crate::fixer;
use crate::indexer;
use crate::registry::Registry;
use crate::rule::{Descriptor, Rule, RuleBox, RuleContext};
use crate::scope::ScopeIndex;
use crate::tree::{NodeId, SourceTree};

/// Builder for configuring a [`Linter`].
#[derive(Default)]
pub struct LinterBuilder {
    rules: Vec<RuleBox>,
    config: Config,
    fix: bool,
}

impl LinterBuilder {
    /// Creates a new builder with no rules registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Registers a boxed rule.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the resolved configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Requests fix application (default: false).
    #[must_use]
    pub fn fix(mut self, fix: bool) -> Self {
        self.fix = fix;
        self
    }

    /// Validates configuration against every rule's schema and builds the
    /// linter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateRule`] for colliding identifiers,
    /// [`EngineError::UnknownRule`] when configuration names a rule that is
    /// not registered, and [`EngineError::InvalidOption`] when an option
    /// fails its schema. Validation is all-or-nothing: no pass ever runs
    /// with a partially-applied configuration.
    pub fn build(self) -> Result<Linter, EngineError> {
        let descriptors: Vec<Descriptor> = self.rules.iter().map(|r| r.descriptor()).collect();

        let mut seen = BTreeSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.id) {
                return Err(EngineError::DuplicateRule {
                    rule: descriptor.id.to_string(),
                });
            }
        }

        for (name, settings) in &self.config.rules {
            let Some(descriptor) = descriptors.iter().find(|d| d.id == name) else {
                return Err(EngineError::UnknownRule { rule: name.clone() });
            };
            descriptor.schema.validate(name, settings)?;
        }

        let mut active = Vec::new();
        for (rule, descriptor) in self.rules.into_iter().zip(descriptors) {
            let settings = self
                .config
                .rules
                .get(descriptor.id)
                .cloned()
                .unwrap_or_default();
            let severity = settings.severity.unwrap_or(descriptor.default_severity);
            if severity == Severity::Off {
                debug!(rule = descriptor.id, "rule disabled by configuration");
                continue;
            }
            active.push(ActiveRule {
                rule,
                descriptor,
                severity,
                settings,
            });
        }

        let registry = Registry::build(
            active
                .iter()
                .enumerate()
                .map(|(i, a)| (i, a.descriptor.interests)),
        );

        Ok(Linter {
            rules: active,
            registry,
            fix: self.fix,
        })
    }
}

struct ActiveRule {
    rule: RuleBox,
    descriptor: Descriptor,
    severity: Severity,
    settings: RuleSettings,
}

/// The engine front door: dispatches one deterministic pass per tree.
///
/// A linter is immutable once built and holds no per-pass state, so a host
/// may run passes over different trees from parallel threads at its own
/// discretion.
pub struct Linter {
    rules: Vec<ActiveRule>,
    registry: Registry,
    fix: bool,
}

impl std::fmt::Debug for Linter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linter")
            .field("rule_count", &self.rules.len())
            .field("fix", &self.fix)
            .finish_non_exhaustive()
    }
}

impl Linter {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> LinterBuilder {
        LinterBuilder::new()
    }

    /// Number of enabled rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Descriptors of the enabled rules, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.rules.iter().map(|a| &a.descriptor)
    }

    /// Runs one pass over one tree.
    ///
    /// Traversal is a deterministic depth-first walk with children visited
    /// in source order; findings come back sorted by span start, then rule
    /// identifier. When fixing was requested the result also carries the
    /// rewritten source and each finding's fix status.
    #[must_use]
    pub fn run(&self, tree: &SourceTree) -> PassResult {
        info!(
            nodes = tree.node_count(),
            rules = self.rules.len(),
            "starting analysis pass"
        );

        let (scopes, control) = indexer::build(tree);
        let mut states: Vec<Box<dyn Any>> =
            self.rules.iter().map(|a| a.rule.begin_pass()).collect();
        let mut findings = Vec::new();

        self.walk(tree, tree.root(), &scopes, &control, &mut states, &mut findings);

        findings.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then_with(|| a.rule.cmp(&b.rule))
        });

        let mut result = PassResult {
            findings,
            fixed_source: None,
        };

        if self.fix {
            let outcome = fixer::apply(tree.source(), &result.findings);
            for index in outcome.applied {
                result.findings[index].fix_status = FixStatus::Applied;
            }
            for index in outcome.conflicted {
                result.findings[index].fix_status = FixStatus::Conflicted;
            }
            result.fixed_source = Some(outcome.source);
        }

        info!(findings = result.findings.len(), "analysis pass complete");
        result
    }

    fn walk(
        &self,
        tree: &SourceTree,
        node: NodeId,
        scopes: &ScopeIndex,
        control: &ControlIndex,
        states: &mut [Box<dyn Any>],
        findings: &mut Vec<crate::finding::Finding>,
    ) {
        for &index in self.registry.interested(tree.kind(node)) {
            let active = &self.rules[index];
            let ctx = RuleContext {
                tree,
                scopes,
                control,
                rule: active.descriptor.id,
                code: active.descriptor.code,
                severity: active.severity,
                settings: &active.settings,
            };
            let state = &mut states[index];
            match catch_unwind(AssertUnwindSafe(|| {
                active.rule.check(&ctx, node, state.as_mut())
            })) {
                Ok(mut emitted) => findings.append(&mut emitted),
                Err(payload) => {
                    warn!(rule = active.descriptor.id, "rule panicked; isolating");
                    findings.push(internal_failure(tree, &ctx, node, payload.as_ref()));
                }
            }
        }

        for child in tree.children_in_order(node) {
            self.walk(tree, *child, scopes, control, states, findings);
        }
    }
}

/// Synthetic finding reporting that a rule failed to run on one node.
///
/// The failure is contained: the rest of the pass continues and the result
/// set is never silently truncated.
fn internal_failure(
    tree: &SourceTree,
    ctx: &RuleContext<'_>,
    node: NodeId,
    payload: &(dyn Any + Send),
) -> crate::finding::Finding {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    let span = tree.span(node);
    let (line, column) = tree.line_col(span.start);
    crate::finding::Finding::new(
        ctx.rule,
        ctx.code,
        Severity::Error,
        span,
        line,
        column,
        Message::new(
            "internal-error",
            format!("rule `{}` failed to run on this node: {detail}", ctx.rule),
        ),
    )
}
