//! Resolved configuration handed to the engine, plus option schemas.
//!
//! Loading and layering of configuration files is a host concern; the engine
//! receives one fully-materialized rule-id → settings map and validates it
//! eagerly against each rule's declared schema before the pass starts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::finding::Severity;

/// Resolved configuration for one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-rule settings, keyed by rule identifier.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSettings>,
}

impl Config {
    /// Creates an empty configuration (every rule at its default severity).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigSyntax`] when the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::ConfigSyntax {
            message: e.to_string(),
        })
    }

    /// Settings for one rule, if configured.
    #[must_use]
    pub fn rule(&self, rule: &str) -> Option<&RuleSettings> {
        self.rules.get(rule)
    }

    /// Adds settings for a rule, replacing any existing entry.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>, settings: RuleSettings) -> Self {
        self.rules.insert(rule.into(), settings);
        self
    }
}

/// Per-rule settings: an optional severity override plus named options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Severity override; `off` disables the rule.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

impl RuleSettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the severity override.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Sets one option value.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Gets a boolean option with a default value.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    /// Gets an integer option with a default value.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.options
            .get(key)
            .and_then(toml::Value::as_integer)
            .unwrap_or(default)
    }

    /// Gets a string option with a default value.
    #[must_use]
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// Gets a string array option; `None` when not configured.
    #[must_use]
    pub fn get_str_array(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| v.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
    }
}

/// Type expected for one named option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean flag.
    Bool,
    /// Integer value.
    Integer,
    /// String value.
    String,
    /// Array of strings.
    StringArray,
}

impl ValueKind {
    fn matches(self, value: &toml::Value) -> bool {
        match self {
            Self::Bool => value.is_bool(),
            Self::Integer => value.is_integer(),
            Self::String => value.is_str(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|arr| arr.iter().all(toml::Value::is_str)),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Bool => "a boolean",
            Self::Integer => "an integer",
            Self::String => "a string",
            Self::StringArray => "an array of strings",
        }
    }
}

/// One named option a rule accepts.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    /// Option key.
    pub name: &'static str,
    /// Expected value type.
    pub kind: ValueKind,
    /// Documented default, for listings.
    pub default: &'static str,
}

/// The set of options a rule declares.
///
/// Validated eagerly at pass start; unknown keys and wrong-typed values are
/// configuration errors, never silently ignored.
#[derive(Debug, Clone, Copy)]
pub struct OptionSchema {
    options: &'static [OptionSpec],
}

impl OptionSchema {
    /// Schema of a rule that accepts no options.
    pub const EMPTY: OptionSchema = OptionSchema { options: &[] };

    /// Creates a schema from a static option list.
    #[must_use]
    pub const fn new(options: &'static [OptionSpec]) -> Self {
        Self { options }
    }

    /// Declared options.
    #[must_use]
    pub fn options(&self) -> &'static [OptionSpec] {
        self.options
    }

    /// Validates configured settings against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidOption`] naming the rule and the
    /// offending key for unknown keys or type mismatches.
    pub fn validate(&self, rule: &str, settings: &RuleSettings) -> Result<(), EngineError> {
        for (key, value) in &settings.options {
            let Some(spec) = self.options.iter().find(|o| o.name == key) else {
                return Err(EngineError::InvalidOption {
                    rule: rule.to_string(),
                    key: key.clone(),
                    message: "unknown option".to_string(),
                });
            };
            if !spec.kind.matches(value) {
                return Err(EngineError::InvalidOption {
                    rule: rule.to_string(),
                    key: key.clone(),
                    message: format!("expected {}", spec.kind.describe()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: OptionSchema = OptionSchema::new(&[
        OptionSpec {
            name: "allow_void",
            kind: ValueKind::Bool,
            default: "true",
        },
        OptionSpec {
            name: "promise_functions",
            kind: ValueKind::StringArray,
            default: "[\"fetch\"]",
        },
    ]);

    #[test]
    fn parses_rule_settings_from_toml() {
        let config = Config::parse(
            r#"
[rules.no-unhandled-promise]
severity = "warn"
allow_void = false
promise_functions = ["fetchUserData"]
"#,
        )
        .expect("parses");

        let settings = config.rule("no-unhandled-promise").expect("configured");
        assert_eq!(settings.severity, Some(Severity::Warn));
        assert!(!settings.get_bool("allow_void", true));
        assert_eq!(
            settings.get_str_array("promise_functions"),
            Some(vec!["fetchUserData".to_string()])
        );
    }

    #[test]
    fn schema_rejects_unknown_key() {
        let settings = RuleSettings::new().option("allow_viod", true);
        let err = SCHEMA
            .validate("no-unhandled-promise", &settings)
            .expect_err("unknown key");
        match err {
            EngineError::InvalidOption { rule, key, .. } => {
                assert_eq!(rule, "no-unhandled-promise");
                assert_eq!(key, "allow_viod");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_rejects_type_mismatch() {
        let settings = RuleSettings::new().option("allow_void", "yes");
        assert!(SCHEMA.validate("r", &settings).is_err());
    }

    #[test]
    fn schema_accepts_valid_settings() {
        let settings = RuleSettings::new()
            .option("allow_void", false)
            .option("promise_functions", toml::Value::Array(vec![]));
        assert!(SCHEMA.validate("r", &settings).is_ok());
    }

    #[test]
    fn invalid_toml_is_a_syntax_error() {
        assert!(matches!(
            Config::parse("rules = ["),
            Err(EngineError::ConfigSyntax { .. })
        ));
    }

    #[test]
    fn typed_getters_fall_back_to_defaults() {
        let settings = RuleSettings::new();
        assert!(settings.get_bool("missing", true));
        assert_eq!(settings.get_int("missing", 7), 7);
        assert_eq!(settings.get_str("missing", "x"), "x");
        assert_eq!(settings.get_str_array("missing"), None);
    }
}
