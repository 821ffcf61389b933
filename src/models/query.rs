//! Query term, cache mode and per-iteration policy models

use serde::{Deserialize, Serialize};
use std::fmt;

/// A family name searched once per iteration
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTerm(String);

impl QueryTerm {
    /// Build a term from raw text, trimming whitespace. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QueryTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a search may be answered from a cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Enabled,
    Disabled,
}

impl CacheMode {
    /// Value of the `Cache-Control` request header, if one is sent
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            CacheMode::Enabled => None,
            CacheMode::Disabled => Some("no-cache"),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Enabled => write!(f, "cache enabled"),
            CacheMode::Disabled => write!(f, "cache disabled"),
        }
    }
}

/// Selects the cache mode for each iteration.
///
/// Iterations listed in `disable_on` bypass caches; every other iteration
/// accepts cached responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRule {
    #[serde(default)]
    pub disable_on: Vec<u32>,
}

impl Default for CacheRule {
    fn default() -> Self {
        Self {
            disable_on: vec![3],
        }
    }
}

impl CacheRule {
    /// Rule that never disables the cache
    pub fn always_enabled() -> Self {
        Self {
            disable_on: Vec::new(),
        }
    }

    pub fn disable_on(iterations: impl IntoIterator<Item = u32>) -> Self {
        Self {
            disable_on: iterations.into_iter().collect(),
        }
    }

    /// Cache mode for a 1-based iteration index
    pub fn cache_mode(&self, iteration: u32) -> CacheMode {
        if self.disable_on.contains(&iteration) {
            CacheMode::Disabled
        } else {
            CacheMode::Enabled
        }
    }
}

/// What the controller does when a single search fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Stop the whole run at the first failure
    #[default]
    Abort,
    /// Record a failed sample and keep going
    Continue,
}

impl FaultPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "abort" => Some(FaultPolicy::Abort),
            "continue" | "skip" => Some(FaultPolicy::Continue),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_term_parse() {
        assert_eq!(QueryTerm::parse("  SMITH ").unwrap().as_str(), "SMITH");
        assert!(QueryTerm::parse("").is_none());
        assert!(QueryTerm::parse("   \t").is_none());
    }

    #[test]
    fn test_default_rule_disables_third_iteration() {
        let rule = CacheRule::default();
        assert_eq!(rule.cache_mode(1), CacheMode::Enabled);
        assert_eq!(rule.cache_mode(2), CacheMode::Enabled);
        assert_eq!(rule.cache_mode(3), CacheMode::Disabled);
        assert_eq!(rule.cache_mode(4), CacheMode::Enabled);
    }

    #[test]
    fn test_custom_rule() {
        let rule = CacheRule::disable_on([1, 4]);
        assert_eq!(rule.cache_mode(1), CacheMode::Disabled);
        assert_eq!(rule.cache_mode(3), CacheMode::Enabled);
        assert_eq!(rule.cache_mode(4), CacheMode::Disabled);
        assert_eq!(CacheRule::always_enabled().cache_mode(3), CacheMode::Enabled);
    }

    #[test]
    fn test_cache_header_value() {
        assert_eq!(CacheMode::Enabled.header_value(), None);
        assert_eq!(CacheMode::Disabled.header_value(), Some("no-cache"));
    }

    #[test]
    fn test_fault_policy_from_str() {
        assert_eq!(FaultPolicy::from_str("ABORT"), Some(FaultPolicy::Abort));
        assert_eq!(FaultPolicy::from_str("continue"), Some(FaultPolicy::Continue));
        assert_eq!(FaultPolicy::from_str("retry"), None);
    }
}
