//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bypass_sim_decisions_total` (counter): decisions by outcome, reason
//! - `bypass_sim_waf_blocks_total` (counter): WAF blocks by rule label
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is opt-in; the simulator is a test double

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::engine::decision::{Decision, ReasonKind};

pub const DECISIONS_TOTAL: &str = "bypass_sim_decisions_total";
pub const WAF_BLOCKS_TOTAL: &str = "bypass_sim_waf_blocks_total";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe() {
    metrics::describe_counter!(DECISIONS_TOTAL, "Decisions by outcome and reason");
    metrics::describe_counter!(WAF_BLOCKS_TOTAL, "WAF blocks by rule label");
}

/// Count one decision.
pub fn record_decision(decision: &Decision) {
    metrics::counter!(
        DECISIONS_TOTAL,
        "outcome" => decision.outcome.as_str(),
        "reason" => decision.reason.as_str()
    )
    .increment(1);

    if decision.reason == ReasonKind::WafBlocked {
        if let Some(rule) = &decision.matched_pattern {
            metrics::counter!(WAF_BLOCKS_TOTAL, "rule" => rule.clone()).increment(1);
        }
    }
}
