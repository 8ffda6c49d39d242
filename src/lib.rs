//! Bypass simulator library.
//!
//! A deterministic access-control and WAF simulator: a target that reacts
//! to path-normalization tricks, trust-sensitive headers and blocklisted
//! payloads exactly the way misconfigured real-world front ends do.

pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::SimulatorConfig;
pub use engine::{Decision, DecisionEngine, Outcome, ReasonKind, RuleSet, SimRequest};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
