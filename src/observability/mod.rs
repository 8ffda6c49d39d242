//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every HTTP decision:
//!     → logging.rs (one structured line, level by outcome)
//!     → metrics.rs (outcome/reason counters, WAF rule counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the request-id layer into every decision line
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
