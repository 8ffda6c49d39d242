//! Trust-sensitive header inspection.
//!
//! # Responsibilities
//! - Derive bypass grants from forwarded-identity headers
//! - Derive grants from URL-override headers
//! - Derive a grant from a trusted `Host` value
//!
//! # Design Decisions
//! - Pure lookup over an already-parsed header map, no I/O
//! - IP trust is a substring test; that naivety is the simulated bug
//! - Grants are not ranked here; precedence belongs to the engine
//! - A missing header is not an error, it simply yields no grant

use crate::config::schema::HeaderPolicyConfig;
use crate::engine::decision::GrantKind;
use crate::engine::request::Headers;

/// Evidence, taken from one header, that a bypass condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderGrant {
    IpWhitelist { header: String, value: String },
    UrlOverride { header: String, value: String },
    Host { header: String, value: String },
}

impl HeaderGrant {
    pub fn kind(&self) -> GrantKind {
        match self {
            HeaderGrant::IpWhitelist { .. } => GrantKind::IpWhitelist,
            HeaderGrant::UrlOverride { .. } => GrantKind::UrlOverride,
            HeaderGrant::Host { .. } => GrantKind::Host,
        }
    }

    /// `Name: value` form used in decisions and logs.
    pub fn describe(&self) -> String {
        let (header, value) = match self {
            HeaderGrant::IpWhitelist { header, value }
            | HeaderGrant::UrlOverride { header, value }
            | HeaderGrant::Host { header, value } => (header, value),
        };
        format!("{header}: {value}")
    }
}

/// Evaluates a header map against the configured header policy.
///
/// Trusted values and override targets are lowercased once here so that
/// per-request checks only lowercase the header value.
#[derive(Debug, Clone)]
pub struct HeaderPolicyEvaluator {
    trusted_values: Vec<String>,
    ip_headers: Vec<String>,
    override_headers: Vec<String>,
    host_header: String,
    override_targets: Vec<String>,
}

impl HeaderPolicyEvaluator {
    pub fn new(config: &HeaderPolicyConfig) -> Self {
        Self {
            trusted_values: lowercase_all(&config.trusted_values),
            ip_headers: config.ip_headers.clone(),
            override_headers: config.override_headers.clone(),
            host_header: config.host_header.clone(),
            override_targets: lowercase_all(&config.override_targets),
        }
    }

    /// Collect every grant the headers establish, at most one per kind.
    pub fn evaluate(&self, headers: &Headers) -> Vec<HeaderGrant> {
        let mut grants = Vec::new();

        if let Some(grant) = self.ip_grant(headers) {
            grants.push(grant);
        }
        if let Some(grant) = self.override_grant(headers) {
            grants.push(grant);
        }
        if let Some(grant) = self.host_grant(headers) {
            grants.push(grant);
        }

        grants
    }

    fn ip_grant(&self, headers: &Headers) -> Option<HeaderGrant> {
        self.ip_headers.iter().find_map(|name| {
            let value = headers.get(name)?;
            let lowered = value.to_ascii_lowercase();
            self.trusted_values
                .iter()
                .any(|trusted| lowered.contains(trusted.as_str()))
                .then(|| HeaderGrant::IpWhitelist {
                    header: name.clone(),
                    value: value.to_string(),
                })
        })
    }

    fn override_grant(&self, headers: &Headers) -> Option<HeaderGrant> {
        self.override_headers.iter().find_map(|name| {
            let value = headers.get(name)?.trim();
            if value.is_empty() || !self.override_target_allowed(value) {
                return None;
            }
            Some(HeaderGrant::UrlOverride {
                header: name.clone(),
                value: value.to_string(),
            })
        })
    }

    fn host_grant(&self, headers: &Headers) -> Option<HeaderGrant> {
        let name = &self.host_header;
        let value = headers.get(name)?;
        let lowered = value.trim().to_ascii_lowercase();

        self.trusted_values
            .iter()
            .any(|trusted| *trusted == lowered)
            .then(|| HeaderGrant::Host {
                header: name.clone(),
                value: value.to_string(),
            })
    }

    fn override_target_allowed(&self, value: &str) -> bool {
        if self.override_targets.is_empty() {
            return true;
        }
        let lowered = value.to_ascii_lowercase();
        self.override_targets
            .iter()
            .any(|target| lowered.contains(target.as_str()))
    }
}

impl Default for HeaderPolicyEvaluator {
    fn default() -> Self {
        Self::new(&HeaderPolicyConfig::default())
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_ascii_lowercase()).collect()
}
