//! Rule presets for common configurations.

use crate::{NoStringQueries, NoUnhandledPromise, NoVar, RequireRouteGuard};
use treelint_core::RuleBox;

/// Preset configurations for treelint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Recommended rules with sensible defaults.
    Recommended,
    /// Security rules only.
    Security,
    /// Minimal rules for gradual adoption.
    Minimal,
}

impl Preset {
    /// Returns the rules for this preset.
    #[must_use]
    pub fn rules(self) -> Vec<RuleBox> {
        match self {
            Self::Recommended => recommended_rules(),
            Self::Security => security_rules(),
            Self::Minimal => minimal_rules(),
        }
    }
}

/// Returns the recommended set of rules.
///
/// Includes:
/// - `no-unhandled-promise` (TL001) - Requires rejection handling
/// - `require-route-guard` (TL002) - Requires auth/CSRF guards on routes
/// - `no-string-queries` (TL003) - Forbids string-built queries
/// - `no-var` (TL004) - Forbids `var` declarations
#[must_use]
pub fn recommended_rules() -> Vec<RuleBox> {
    vec![
        Box::new(NoUnhandledPromise::new()),
        Box::new(RequireRouteGuard::new()),
        Box::new(NoStringQueries::new()),
        Box::new(NoVar::new()),
    ]
}

/// Returns the security-focused set of rules.
///
/// Includes:
/// - `require-route-guard` (TL002)
/// - `no-string-queries` (TL003)
#[must_use]
pub fn security_rules() -> Vec<RuleBox> {
    vec![
        Box::new(RequireRouteGuard::new()),
        Box::new(NoStringQueries::new()),
    ]
}

/// Returns the minimal set of rules.
///
/// For gradual adoption, only includes:
/// - `no-var` (TL004), which carries an automatic fix
#[must_use]
pub fn minimal_rules() -> Vec<RuleBox> {
    vec![Box::new(NoVar::new())]
}

/// Returns all available rules.
#[must_use]
pub fn all_rules() -> Vec<RuleBox> {
    recommended_rules()
}

#[cfg(test)]
mod tests {
    use super::*;
    use treelint_core::Linter;

    #[test]
    fn preset_rules_are_not_empty() {
        assert!(!Preset::Recommended.rules().is_empty());
        assert!(!Preset::Security.rules().is_empty());
        assert!(!Preset::Minimal.rules().is_empty());
    }

    #[test]
    fn all_rules_register_without_id_conflicts() {
        let mut builder = Linter::builder();
        for rule in all_rules() {
            builder = builder.rule_box(rule);
        }
        let linter = builder.build().expect("unique rule ids");
        assert_eq!(linter.rule_count(), 4);
    }
}
