//! The immutable rule set every decision is evaluated against.
//!
//! # Responsibilities
//! - Compile the blocklist from the WAF configuration
//! - Freeze protected resources and header policy
//!
//! # Design Decisions
//! - Built once at startup, never mutated, shared read-only (Arc)
//! - A rule that fails to compile aborts construction
//! - Disabled rules are compiled too, so a broken pattern is never hidden

use thiserror::Error;

use crate::config::schema::{SimulatorConfig, UnlockPolicy, WafConfig};
use crate::security::blocklist::{BlockRule, PatternBlocklist, RegexCompileError, DEFAULT_RULES};
use crate::security::canonical::fold_case;
use crate::security::header_policy::HeaderPolicyEvaluator;

/// Errors raised while building a [`RuleSet`].
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error(transparent)]
    RegexCompile(#[from] RegexCompileError),
}

/// A named, exact-match, access-controlled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedResource {
    path: String,
    folded: String,
    unlock: UnlockPolicy,
}

impl ProtectedResource {
    pub fn new(path: impl Into<String>, unlock: UnlockPolicy) -> Self {
        let path = path.into();
        let folded = fold_case(&path);
        Self {
            path,
            folded,
            unlock,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lowercased path, for case-folded comparisons.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn unlock(&self) -> &UnlockPolicy {
        &self.unlock
    }
}

/// Everything the engine needs, compiled and frozen.
#[derive(Debug, Clone)]
pub struct RuleSet {
    resources: Vec<ProtectedResource>,
    blocklist: PatternBlocklist,
    headers: HeaderPolicyEvaluator,
    waf_enabled: bool,
    inspect_body: bool,
}

impl RuleSet {
    pub fn new(
        resources: Vec<ProtectedResource>,
        blocklist: PatternBlocklist,
        headers: HeaderPolicyEvaluator,
    ) -> Self {
        Self {
            resources,
            blocklist,
            headers,
            waf_enabled: true,
            inspect_body: true,
        }
    }

    /// Compile a rule set from a (validated) configuration.
    pub fn from_config(config: &SimulatorConfig) -> Result<Self, RuleSetError> {
        let resources = config
            .resources
            .iter()
            .map(|r| ProtectedResource::new(r.path.clone(), r.unlock.clone()))
            .collect();
        let blocklist = compile_blocklist(&config.waf)?;
        let headers = HeaderPolicyEvaluator::new(&config.headers);

        Ok(Self {
            resources,
            blocklist,
            headers,
            waf_enabled: config.waf.enabled,
            inspect_body: config.waf.inspect_body,
        })
    }

    pub fn resources(&self) -> &[ProtectedResource] {
        &self.resources
    }

    pub fn blocklist(&self) -> &PatternBlocklist {
        &self.blocklist
    }

    pub fn header_policy(&self) -> &HeaderPolicyEvaluator {
        &self.headers
    }

    pub fn waf_enabled(&self) -> bool {
        self.waf_enabled
    }

    pub fn inspect_body(&self) -> bool {
        self.inspect_body
    }
}

/// Built-in rules first (minus disabled ones), then configured rules.
fn compile_blocklist(waf: &WafConfig) -> Result<PatternBlocklist, RegexCompileError> {
    let mut rules = Vec::new();

    if waf.include_defaults {
        for (label, pattern) in DEFAULT_RULES {
            let enabled = !waf.disabled.iter().any(|d| d == label);
            rules.push(BlockRule::new(*label, pattern, enabled)?);
        }
    }

    for rule in &waf.rules {
        rules.push(BlockRule::new(rule.label.clone(), &rule.pattern, rule.enabled)?);
    }

    Ok(PatternBlocklist::new(rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BlockRuleConfig;

    #[test]
    fn test_default_rule_set() {
        let rules = RuleSet::from_config(&SimulatorConfig::default()).unwrap();
        assert_eq!(rules.resources().len(), 3);
        assert_eq!(rules.resources()[0].path(), "/admin");
        assert_eq!(rules.blocklist().enabled_count(), DEFAULT_RULES.len());
        assert!(rules.waf_enabled());
    }

    #[test]
    fn test_disabled_defaults_keep_their_slot() {
        let mut config = SimulatorConfig::default();
        config.waf.disabled = vec!["event_handler".into()];
        config.waf.rules.push(BlockRuleConfig {
            label: "admin_path".into(),
            pattern: "/admin".into(),
            enabled: true,
        });

        let rules = RuleSet::from_config(&config).unwrap();
        let list = rules.blocklist().rules();
        assert_eq!(list.len(), DEFAULT_RULES.len() + 1);
        assert!(!list[DEFAULT_RULES.len() - 1].enabled());
        assert_eq!(list.last().unwrap().label(), "admin_path");
    }

    #[test]
    fn test_broken_pattern_is_fatal_even_when_disabled() {
        let mut config = SimulatorConfig::default();
        config.waf.rules.push(BlockRuleConfig {
            label: "broken".into(),
            pattern: "[a-".into(),
            enabled: false,
        });

        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_resource_folding() {
        let resource = ProtectedResource::new("/Admin", UnlockPolicy::Any);
        assert_eq!(resource.path(), "/Admin");
        assert_eq!(resource.folded(), "/admin");
    }
}
