//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the simulator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::engine::decision::GrantKind;

/// Root configuration for the bypass simulator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Presentation of decisions on the wire.
    pub response: ResponseConfig,

    /// Simulated WAF blocklist.
    pub waf: WafConfig,

    /// Header trust parameters.
    pub headers: HeaderPolicyConfig,

    /// Access-controlled resources.
    pub resources: Vec<ResourceConfig>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            observability: ObservabilityConfig::default(),
            response: ResponseConfig::default(),
            waf: WafConfig::default(),
            headers: HeaderPolicyConfig::default(),
            resources: vec![
                ResourceConfig::new("/admin", UnlockPolicy::Any),
                ResourceConfig::new("/restricted", UnlockPolicy::Any),
                ResourceConfig::new(
                    "/combined",
                    UnlockPolicy::All(vec![GrantKind::IpWhitelist, GrantKind::UrlOverride]),
                ),
            ],
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8000").
    pub bind_address: String,

    /// Request timeout (reading the body included) in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body buffered for inspection.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Response body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    Html,
    Json,
}

/// How decisions are rendered.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// `Server` header on every response.
    pub server_header: String,

    /// `Server` header on WAF blocks, when it should differ.
    pub waf_server_header: Option<String>,

    /// Name of the synthetic ray-id header added to WAF blocks.
    pub ray_header: String,

    /// Default body format; `Accept: application/json` always wins.
    pub format: BodyFormat,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            server_header: "BypassSim/1.0".to_string(),
            waf_server_header: Some("cloudflare".to_string()),
            ray_header: "CF-RAY".to_string(),
            format: BodyFormat::Html,
        }
    }
}

/// A user-defined block rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockRuleConfig {
    /// Reported as the matched pattern.
    pub label: String,

    /// Regular expression, matched case-insensitively.
    pub pattern: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Simulated WAF configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WafConfig {
    /// Master switch for the blocklist.
    pub enabled: bool,

    /// Start from the built-in rules.
    pub include_defaults: bool,

    /// Inspect bodies of state-changing requests.
    pub inspect_body: bool,

    /// Labels of built-in rules to switch off.
    pub disabled: Vec<String>,

    /// Extra rules, appended after the built-in ones.
    pub rules: Vec<BlockRuleConfig>,
}

impl Default for WafConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_defaults: true,
            inspect_body: true,
            disabled: Vec::new(),
            rules: Vec::new(),
        }
    }
}

/// Header trust configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Values treated as "internal" (matched in IP and Host headers).
    pub trusted_values: Vec<String>,

    /// Forwarded-identity headers, checked in order.
    pub ip_headers: Vec<String>,

    /// URL-override headers, checked in order.
    pub override_headers: Vec<String>,

    /// Header compared against the trusted values for a host grant.
    pub host_header: String,

    /// Substrings an override target must contain; empty accepts any.
    pub override_targets: Vec<String>,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            trusted_values: vec![
                "127.0.0.1".to_string(),
                "localhost".to_string(),
                "::1".to_string(),
            ],
            ip_headers: vec!["X-Forwarded-For".to_string(), "X-Real-IP".to_string()],
            override_headers: vec!["X-Original-URL".to_string(), "X-Rewrite-URL".to_string()],
            host_header: "Host".to_string(),
            override_targets: Vec::new(),
        }
    }
}

/// Which header grants open a protected resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// No header grant opens it; only path bypasses reach it.
    None,
    /// Any single grant opens it.
    #[default]
    Any,
    /// Every listed grant kind is required.
    All(Vec<GrantKind>),
}

/// A protected resource (exact-match path).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    pub path: String,

    #[serde(default)]
    pub unlock: UnlockPolicy,
}

impl ResourceConfig {
    pub fn new(path: impl Into<String>, unlock: UnlockPolicy) -> Self {
        Self {
            path: path.into(),
            unlock,
        }
    }
}
