//! Decision types produced by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final access outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Allow,
    Block,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allow => "ALLOW",
            Outcome::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the engine reached its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    None,
    TrailingSlashBypass,
    EncodingBypass,
    CaseBypass,
    DotSegmentBypass,
    HeaderIpBypass,
    HeaderUrlOverrideBypass,
    HostHeaderBypass,
    WafBlocked,
    Protected,
    Default,
    /// Evaluation panicked; only ever paired with BLOCK.
    EvaluationFault,
}

impl ReasonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonKind::None => "none",
            ReasonKind::TrailingSlashBypass => "trailing_slash_bypass",
            ReasonKind::EncodingBypass => "encoding_bypass",
            ReasonKind::CaseBypass => "case_bypass",
            ReasonKind::DotSegmentBypass => "dot_segment_bypass",
            ReasonKind::HeaderIpBypass => "header_ip_bypass",
            ReasonKind::HeaderUrlOverrideBypass => "header_url_override_bypass",
            ReasonKind::HostHeaderBypass => "host_header_bypass",
            ReasonKind::WafBlocked => "waf_blocked",
            ReasonKind::Protected => "protected",
            ReasonKind::Default => "default",
            ReasonKind::EvaluationFault => "evaluation_fault",
        }
    }
}

impl fmt::Display for ReasonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of header grant, in precedence order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    IpWhitelist,
    UrlOverride,
    Host,
}

impl GrantKind {
    /// The reason reported when this grant unlocks a resource.
    pub fn bypass_reason(&self) -> ReasonKind {
        match self {
            GrantKind::IpWhitelist => ReasonKind::HeaderIpBypass,
            GrantKind::UrlOverride => ReasonKind::HeaderUrlOverrideBypass,
            GrantKind::Host => ReasonKind::HostHeaderBypass,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::IpWhitelist => "ip_whitelist",
            GrantKind::UrlOverride => "url_override",
            GrantKind::Host => "host",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: ReasonKind,
    /// Label of the block rule that fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    /// `Name: value` of the header that granted access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_header: Option<String>,
    /// Protected resource the request resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Grant kinds a combined-protection resource still needed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_grants: Vec<GrantKind>,
}

impl Decision {
    pub fn allow(reason: ReasonKind) -> Self {
        Self::new(Outcome::Allow, reason)
    }

    pub fn block(reason: ReasonKind) -> Self {
        Self::new(Outcome::Block, reason)
    }

    fn new(outcome: Outcome, reason: ReasonKind) -> Self {
        Self {
            outcome,
            reason,
            matched_pattern: None,
            matched_header: None,
            resource: None,
            missing_grants: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, label: impl Into<String>) -> Self {
        self.matched_pattern = Some(label.into());
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.matched_header = Some(header.into());
        self
    }

    pub fn with_resource(mut self, path: impl Into<String>) -> Self {
        self.resource = Some(path.into());
        self
    }

    pub fn with_missing(mut self, missing: Vec<GrantKind>) -> Self {
        self.missing_grants = missing;
        self
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}
