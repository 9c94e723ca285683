//! Ordered metric name rewrite rules
//!
//! A rewrite rule is a `(pattern, replacement)` pair applied to a sanitized
//! metric name with regex `replace_all` semantics. Rules run in configured
//! order, each one seeing the output of the previous one, so reordering rules
//! changes the result. A rule that reduces a name to the empty string drops
//! the metric.
//!
//! # Example Configuration (YAML)
//!
//! ```yaml
//! rewrite:
//!   - pattern: "java"
//!     replacement: "coffee"
//!   - pattern: "-v\\d+\\.\\d+\\.\\d+"
//!     replacement: "-AllVersions"
//!   - pattern: ".*GetS2Activities.*"
//!     replacement: ""
//! ```
//!
//! Replacements use the `regex` crate syntax for group references (`$1`,
//! `${name}`).

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// A single find/replace rewrite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Regex searched for in the metric name
    pub pattern: String,

    /// Replacement text
    #[serde(default)]
    pub replacement: String,

    /// Compiled regex pattern (internal, not serialized)
    #[serde(skip)]
    compiled_pattern: OnceCell<Regex>,
}

impl RewriteRule {
    /// Create a new rewrite rule
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            compiled_pattern: OnceCell::new(),
        }
    }

    /// Compile the regex pattern
    ///
    /// The pattern is compiled on first call; later calls return the cached regex.
    pub fn compile(&self) -> RuleResult<&Regex> {
        self.compiled_pattern.get_or_try_init(|| {
            Regex::new(&self.pattern).map_err(|e| RuleError::InvalidPattern {
                pattern: self.pattern.clone(),
                source: e,
            })
        })
    }

    /// Apply the rule to `input`, returning the rewritten text
    pub fn apply(&self, input: &str) -> RuleResult<String> {
        let regex = self.compile()?;
        Ok(regex
            .replace_all(input, self.replacement.as_str())
            .into_owned())
    }
}

/// Rewrite rules applied in order
#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    rules: Vec<RewriteRule>,
}

impl RewriteRules {
    /// Build a rule list, dropping rules whose pattern does not compile
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        let rules = rules
            .into_iter()
            .enumerate()
            .filter_map(|(index, rule)| match rule.compile() {
                Ok(_) => Some(rule),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping invalid rewrite rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Number of active rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no active rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order
    pub fn apply(&self, input: &str) -> String {
        let mut text = input.to_string();
        for rule in &self.rules {
            // Rules are compiled in `new`, so this never fails.
            if let Ok(rewritten) = rule.apply(&text) {
                text = rewritten;
            }
        }
        text
    }
}
