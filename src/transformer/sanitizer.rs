//! Metric name sanitizer
//!
//! Every formatter funnels its metric names through [`NameSanitizer::clean`]:
//!
//! 1. strip `" ' ( ) { } < > [ ]`
//! 2. collapse runs of `:`, `.` and `,` into a single `.`
//! 3. replace any remaining run outside `[A-Za-z0-9_.+-]` with `_`
//! 4. apply the ordered rewrite rules
//!
//! An empty result means the metric must be dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use super::rules::{RewriteRule, RewriteRules};

static STRIP_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["'(){}<>\[\]]"#).expect("static regex"));
static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:,.]+").expect("static regex"));
static INVALID_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_.+-]+").expect("static regex"));

/// Normalizes metric names and applies configured rewrites
#[derive(Debug, Clone, Default)]
pub struct NameSanitizer {
    rewrites: RewriteRules,
}

impl NameSanitizer {
    /// Create a sanitizer with the given ordered rewrite rules
    pub fn new(rewrites: Vec<RewriteRule>) -> Self {
        Self {
            rewrites: RewriteRules::new(rewrites),
        }
    }

    /// Character normalization only, without rewrites
    pub fn normalize(text: &str) -> String {
        let text = STRIP_CHARS.replace_all(text, "");
        let text = SEPARATOR_RUNS.replace_all(&text, ".");
        INVALID_RUNS.replace_all(&text, "_").into_owned()
    }

    /// Normalize `text` and apply the rewrite rules in order
    pub fn clean(&self, text: &str) -> String {
        self.rewrites.apply(&Self::normalize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bean_identity() {
        assert_eq!(
            NameSanitizer::normalize("java.lang:name=ParNew,type=GarbageCollector"),
            "java.lang.name_ParNew.type_GarbageCollector"
        );
    }

    #[test]
    fn test_normalize_strips_brackets_and_quotes() {
        assert_eq!(
            NameSanitizer::normalize(r#"app:name="Par Eden [Space]""#),
            "app.name_Par_Eden_Space"
        );
    }

    #[test]
    fn test_normalize_collapses_separator_runs() {
        assert_eq!(NameSanitizer::normalize("a::b,.,c"), "a.b.c");
    }

    #[test]
    fn test_normalize_keeps_allowed_punctuation() {
        assert_eq!(NameSanitizer::normalize("a+b-c_d"), "a+b-c_d");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "java.lang:name=ParNew,type=GarbageCollector",
            r#"weird "name" (x) {y} <z> [w]"#,
            "kafka.server:name=MessagesInPerSec,topic=foo bar,type=BrokerTopicMetrics",
            "...::,,",
            "",
        ];
        for input in inputs {
            let once = NameSanitizer::normalize(input);
            let twice = NameSanitizer::normalize(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_clean_applies_rewrites() {
        let sanitizer = NameSanitizer::new(vec![
            RewriteRule::new("memoryUsage", "memUsed"),
            RewriteRule::new(r".*\.init", ""),
        ]);
        assert_eq!(
            sanitizer.clean("java.lang:type=Memory.memoryUsage.used"),
            "java.lang.type_Memory.memUsed.used"
        );
        assert_eq!(sanitizer.clean("java.lang:type=Memory.HeapMemoryUsage.init"), "");
    }
}
