//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick pretty or JSON output from configuration
//! - Log one line per decision with its structured fields
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - JSON format for machine parsing, pretty format for development
//! - BLOCK decisions log at info, ALLOW at debug

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};
use crate::engine::decision::{Decision, Outcome};

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("bypass_sim={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .try_init(),
    }
}

/// Emit the per-request decision line.
pub fn log_decision(request_id: &str, method: &str, path: &str, decision: &Decision) {
    let pattern = decision.matched_pattern.as_deref().unwrap_or("");
    let header = decision.matched_header.as_deref().unwrap_or("");
    let resource = decision.resource.as_deref().unwrap_or("");

    match decision.outcome {
        Outcome::Block => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            outcome = %decision.outcome,
            reason = %decision.reason,
            matched_pattern = %pattern,
            resource = %resource,
            missing_grants = ?decision.missing_grants,
            "Request blocked"
        ),
        Outcome::Allow => tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            outcome = %decision.outcome,
            reason = %decision.reason,
            matched_header = %header,
            resource = %resource,
            "Request allowed"
        ),
    }
}
