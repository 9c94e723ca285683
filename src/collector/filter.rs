//! Domain and bean filters
//!
//! - ignore-set: management-only domains plus `domain_blacklist`, never read
//! - `mbean_blacklist`: switches a domain to a scoped listing, skipping
//!   matching beans only
//! - whitelist (`mbeans`): literal or regex inclusion filter on bean identities

use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

use crate::config::Config;
use crate::error::RuleError;
use crate::transformer::NameSanitizer;

/// Domains that only hold management beans
pub const IGNORE_DOMAINS: &[&str] = &[
    "JMImplementation",
    "jmx4perl",
    "jolokia",
    "com.sun.management",
    "java.util.logging",
];

/// Bean inclusion filter
#[derive(Debug, Clone, Default)]
pub enum Whitelist {
    /// Include everything
    #[default]
    All,
    /// Exact match against the raw or sanitized identity
    Literal(Vec<String>),
    /// Match from the start of the raw or sanitized identity
    Patterns(Vec<Regex>),
}

impl Whitelist {
    /// Build a whitelist; invalid patterns are skipped with a warning
    ///
    /// When no pattern compiles, every bean is included.
    pub fn new(entries: &[String], regex: bool) -> Self {
        if entries.is_empty() {
            return Whitelist::All;
        }
        if !regex {
            return Whitelist::Literal(entries.to_vec());
        }

        let patterns = entries
            .iter()
            .filter_map(|entry| match compile_anchored(entry) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid bean pattern");
                    None
                }
            })
            .collect::<Vec<_>>();
        if patterns.is_empty() {
            warn!("No valid bean pattern; including every bean");
            return Whitelist::All;
        }
        Whitelist::Patterns(patterns)
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Whitelist::All => true,
            Whitelist::Literal(entries) => entries.iter().any(|e| e == candidate),
            Whitelist::Patterns(patterns) => patterns.iter().any(|re| re.is_match(candidate)),
        }
    }
}

fn compile_anchored(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Every filter applied during traversal
#[derive(Debug, Clone, Default)]
pub struct BeanFilters {
    ignored_domains: HashSet<String>,
    mbean_blacklist: Vec<String>,
    whitelist: Whitelist,
}

impl BeanFilters {
    /// Create filters from explicit lists
    pub fn new(domain_blacklist: &[String], mbean_blacklist: &[String], whitelist: Whitelist) -> Self {
        let ignored_domains = IGNORE_DOMAINS
            .iter()
            .map(|d| d.to_string())
            .chain(domain_blacklist.iter().cloned())
            .collect();

        Self {
            ignored_domains,
            mbean_blacklist: mbean_blacklist
                .iter()
                .filter(|entry| !entry.is_empty())
                .cloned()
                .collect(),
            whitelist,
        }
    }

    /// Build filters from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.domain_blacklist,
            &config.mbean_blacklist,
            Whitelist::new(&config.mbeans, config.regex),
        )
    }

    /// Domain is never read
    pub fn is_domain_ignored(&self, domain: &str) -> bool {
        self.ignored_domains.contains(domain)
    }

    /// Domain holds blacklisted beans and must be read bean by bean
    pub fn needs_scoped_listing(&self, domain: &str) -> bool {
        self.mbean_blacklist.iter().any(|entry| entry.contains(domain))
    }

    /// Bean identity contains a blacklist entry
    pub fn is_blacklisted(&self, bean: &str) -> bool {
        self.mbean_blacklist.iter().any(|entry| bean.contains(entry.as_str()))
    }

    /// Bean passes the whitelist, by raw or sanitized identity
    pub fn includes(&self, bean: &str, sanitizer: &NameSanitizer) -> bool {
        if matches!(self.whitelist, Whitelist::All) {
            return true;
        }
        self.whitelist.matches(bean) || self.whitelist.matches(&sanitizer.clean(bean))
    }
}
