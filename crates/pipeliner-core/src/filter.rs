//! Repository override filter.

use pipeliner_types::error::ConfigError;
use regex::Regex;

/// Compiled repository-name filter.
///
/// Compiled once at startup; an invalid pattern is a configuration error.
/// Matching is an unanchored search, so `^`/`$` must be spelled out to match
/// whole names.
#[derive(Debug, Clone)]
pub struct OverrideFilter {
    regex: Regex,
}

impl OverrideFilter {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidFilter {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Whether the repository is eligible for a pipeline override.
    pub fn matches(&self, repo_name: &str) -> bool {
        self.regex.is_match(repo_name)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all() {
        let filter = OverrideFilter::new(".*").unwrap();
        assert!(filter.matches("anything"));
        assert!(filter.matches(""));
    }

    #[test]
    fn test_unanchored_search() {
        let filter = OverrideFilter::new("nix").unwrap();
        assert!(filter.matches("my-nix-config"));
        assert!(!filter.matches("dotfiles"));
    }

    #[test]
    fn test_anchored_pattern() {
        let filter = OverrideFilter::new("^infra-.*$").unwrap();
        assert!(filter.matches("infra-hosts"));
        assert!(!filter.matches("my-infra-hosts"));
    }

    #[test]
    fn test_empty_name_does_not_match_non_empty_pattern() {
        let filter = OverrideFilter::new("^.+$").unwrap();
        assert!(!filter.matches(""));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = OverrideFilter::new("(unclosed").unwrap_err();
        match err {
            ConfigError::InvalidFilter { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_as_str_returns_pattern() {
        let filter = OverrideFilter::new("^a|b$").unwrap();
        assert_eq!(filter.as_str(), "^a|b$");
    }
}
