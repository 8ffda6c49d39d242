//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check resource paths and block rule labels are well-formed and unique
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check header names are valid HTTP header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SimulatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Regex compilation is not checked here; the RuleSet build owns it

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{SimulatorConfig, UnlockPolicy};
use crate::security::blocklist::DEFAULT_RULES;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("listener.request_timeout_secs must be greater than 0")]
    ZeroTimeout,

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),

    #[error("resource path must not be empty")]
    EmptyResourcePath,

    #[error("resource path '{0}' must start with '/'")]
    RelativeResourcePath(String),

    #[error("resource path '{0}' is declared more than once")]
    DuplicateResource(String),

    #[error("resource '{0}' requires all of an empty grant list")]
    EmptyGrantRequirement(String),

    #[error("resource '{0}' lists a grant kind more than once")]
    DuplicateGrantRequirement(String),

    #[error("block rule label must not be empty")]
    EmptyRuleLabel,

    #[error("block rule '{0}' has an empty pattern")]
    EmptyPattern(String),

    #[error("block rule label '{0}' is used more than once")]
    DuplicateRuleLabel(String),

    #[error("waf.disabled names unknown built-in rule '{0}'")]
    UnknownDefaultRule(String),

    #[error("{field}: '{value}' is not a valid header name")]
    InvalidHeaderName { field: &'static str, value: String },

    #[error("headers.trusted_values must not contain an empty value")]
    EmptyTrustedValue,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &SimulatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_listener(config, &mut errors);
    validate_observability(config, &mut errors);
    validate_resources(config, &mut errors);
    validate_waf(config, &mut errors);
    validate_headers(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_listener(config: &SimulatorConfig, errors: &mut Vec<ValidationError>) {
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
}

fn validate_observability(config: &SimulatorConfig, errors: &mut Vec<ValidationError>) {
    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: obs.metrics_address.clone(),
        });
    }
}

fn validate_resources(config: &SimulatorConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for resource in &config.resources {
        let path = &resource.path;
        if path.is_empty() {
            errors.push(ValidationError::EmptyResourcePath);
            continue;
        }
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativeResourcePath(path.clone()));
        }
        if !seen.insert(path.as_str()) {
            errors.push(ValidationError::DuplicateResource(path.clone()));
        }

        if let UnlockPolicy::All(kinds) = &resource.unlock {
            if kinds.is_empty() {
                errors.push(ValidationError::EmptyGrantRequirement(path.clone()));
            }
            let unique: HashSet<_> = kinds.iter().collect();
            if unique.len() != kinds.len() {
                errors.push(ValidationError::DuplicateGrantRequirement(path.clone()));
            }
        }
    }
}

fn validate_waf(config: &SimulatorConfig, errors: &mut Vec<ValidationError>) {
    let waf = &config.waf;
    let mut labels: HashSet<&str> = HashSet::new();

    if waf.include_defaults {
        labels.extend(DEFAULT_RULES.iter().map(|(label, _)| *label));
    }

    for name in &waf.disabled {
        if !DEFAULT_RULES.iter().any(|(label, _)| *label == name.as_str()) {
            errors.push(ValidationError::UnknownDefaultRule(name.clone()));
        }
    }

    for rule in &waf.rules {
        if rule.label.trim().is_empty() {
            errors.push(ValidationError::EmptyRuleLabel);
        } else if !labels.insert(rule.label.as_str()) {
            errors.push(ValidationError::DuplicateRuleLabel(rule.label.clone()));
        }
        if rule.pattern.is_empty() {
            errors.push(ValidationError::EmptyPattern(rule.label.clone()));
        }
    }
}

fn validate_headers(config: &SimulatorConfig, errors: &mut Vec<ValidationError>) {
    let headers = &config.headers;

    let named = headers
        .ip_headers
        .iter()
        .map(|name| ("headers.ip_headers", name))
        .chain(
            headers
                .override_headers
                .iter()
                .map(|name| ("headers.override_headers", name)),
        )
        .chain(std::iter::once(("headers.host_header", &headers.host_header)))
        .chain(std::iter::once(("response.ray_header", &config.response.ray_header)));

    for (field, name) in named {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName {
                field,
                value: name.clone(),
            });
        }
    }

    if headers.trusted_values.iter().any(|v| v.trim().is_empty()) {
        errors.push(ValidationError::EmptyTrustedValue);
    }
}
