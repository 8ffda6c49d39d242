//! Ordered pattern blocklist (the simulated WAF).
//!
//! # Responsibilities
//! - Compile configured patterns case-insensitively, once
//! - Match text against rules in declaration order, first hit wins
//!
//! # Design Decisions
//! - A pattern that fails to compile is fatal; protection is never
//!   silently dropped
//! - Disabled rules stay in the list so labels and ordering are reportable
//! - Decoding is the caller's job; the blocklist sees text only

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Upper bound on compiled program size per rule.
const RULE_SIZE_LIMIT: usize = 1 << 20;

/// The built-in rules, in precedence order: `(label, pattern)`.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("path_traversal", r"\.\./"),
    ("script_tag", r"<\s*script\b"),
    ("sql_union_select", r"\bunion\s+(?:all\s+)?select\b"),
    ("sql_drop_table", r"\bdrop\s+table\b"),
    ("code_exec", r"\b(?:exec|eval|system|passthru|shell_exec)\s*\("),
    ("iframe_tag", r"<\s*iframe\b"),
    ("javascript_scheme", r"javascript\s*:"),
    ("event_handler", r"<[^>]*\bon[a-z]+\s*="),
];

/// Error raised while compiling a rule.
#[derive(Debug, Error)]
#[error("rule '{label}' has an invalid pattern: {source}")]
pub struct RegexCompileError {
    pub label: String,
    #[source]
    pub source: regex::Error,
}

/// A single compiled rule.
#[derive(Debug, Clone)]
pub struct BlockRule {
    label: String,
    regex: Regex,
    enabled: bool,
}

impl BlockRule {
    /// Compile a rule. The pattern is always matched case-insensitively.
    pub fn new(
        label: impl Into<String>,
        pattern: &str,
        enabled: bool,
    ) -> Result<Self, RegexCompileError> {
        let label = label.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(RULE_SIZE_LIMIT)
            .build()
            .map_err(|source| RegexCompileError {
                label: label.clone(),
                source,
            })?;

        Ok(Self {
            label,
            regex,
            enabled,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// The first rule that matched a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    pub label: String,
    pub pattern: String,
}

/// Ordered, immutable list of block rules.
#[derive(Debug, Clone, Default)]
pub struct PatternBlocklist {
    rules: Vec<BlockRule>,
}

impl PatternBlocklist {
    pub fn new(rules: Vec<BlockRule>) -> Self {
        Self { rules }
    }

    /// Compile the built-in rules, skipping none.
    pub fn with_defaults() -> Result<Self, RegexCompileError> {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(label, pattern)| BlockRule::new(*label, pattern, true))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Return the first enabled rule that matches `text`.
    pub fn find_match(&self, text: &str) -> Option<BlockMatch> {
        self.rules
            .iter()
            .filter(|rule| rule.enabled)
            .find(|rule| rule.regex.is_match(text))
            .map(|rule| BlockMatch {
                label: rule.label.clone(),
                pattern: rule.pattern().to_string(),
            })
    }

    pub fn rules(&self) -> &[BlockRule] {
        &self.rules
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|rule| rule.enabled).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> PatternBlocklist {
        PatternBlocklist::with_defaults().unwrap()
    }

    fn label_for(text: &str) -> Option<String> {
        defaults().find_match(text).map(|m| m.label)
    }

    #[test]
    fn test_default_rules_compile() {
        let list = defaults();
        assert_eq!(list.rules().len(), DEFAULT_RULES.len());
        assert_eq!(list.enabled_count(), DEFAULT_RULES.len());
    }

    #[test]
    fn test_each_default_rule_fires() {
        assert_eq!(label_for("/files/../etc/passwd").as_deref(), Some("path_traversal"));
        assert_eq!(label_for("/?q=<script>alert(1)</script>").as_deref(), Some("script_tag"));
        assert_eq!(label_for("/?id=1 union select password").as_deref(), Some("sql_union_select"));
        assert_eq!(label_for("/?q=1; drop table users").as_deref(), Some("sql_drop_table"));
        assert_eq!(label_for("/?cmd=exec('ls')").as_deref(), Some("code_exec"));
        assert_eq!(label_for("/?q=<iframe src=x>").as_deref(), Some("iframe_tag"));
        assert_eq!(label_for("/?u=javascript:alert(1)").as_deref(), Some("javascript_scheme"));
        assert_eq!(label_for("/?q=<img src=x onerror=alert(1)>").as_deref(), Some("event_handler"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(label_for("/?q=<SCRIPT>").as_deref(), Some("script_tag"));
        assert_eq!(label_for("/?id=1 UNION SELECT 2").as_deref(), Some("sql_union_select"));
    }

    #[test]
    fn test_first_rule_in_order_wins() {
        // both traversal and script match; traversal is declared first
        let m = defaults().find_match("/../<script>").unwrap();
        assert_eq!(m.label, "path_traversal");
        assert_eq!(m.pattern, r"\.\./");
    }

    #[test]
    fn test_benign_text_passes() {
        assert_eq!(label_for("/api/users?option=1&only=true"), None);
        assert_eq!(label_for("/docs/union-station"), None);
        // encoded payloads are the caller's to decode
        assert_eq!(label_for("/?q=%3Cscript%3E"), None);
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let list = PatternBlocklist::new(vec![
            BlockRule::new("script_tag", r"<script", false).unwrap(),
            BlockRule::new("catch_all", r"script", true).unwrap(),
        ]);
        assert_eq!(list.enabled_count(), 1);
        assert_eq!(list.find_match("<script>").unwrap().label, "catch_all");
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = BlockRule::new("broken", r"(unclosed", true).unwrap_err();
        assert_eq!(err.label, "broken");
        assert!(err.to_string().contains("broken"));
    }
}
