//! Decision engine subsystem.
//!
//! # Data Flow
//! ```text
//! SimulatorConfig
//!     → ruleset.rs (compile blocklist, freeze resources and header policy)
//!     → RuleSet (immutable, Arc-shared)
//!
//! SimRequest (request.rs)
//!     → evaluator.rs (WAF → path bypass → protection → header grants)
//!     → Decision (decision.rs)
//! ```
//!
//! # Design Decisions
//! - The engine is transport-agnostic: no axum types beyond `Method`
//! - Decisions are deterministic for a given (request, rule set) pair
//! - Concurrent evaluations share the rule set without locks

pub mod decision;
pub mod evaluator;
pub mod request;
pub mod ruleset;

pub use decision::{Decision, GrantKind, Outcome, ReasonKind};
pub use evaluator::{decide, DecisionEngine};
pub use request::{Headers, QueryParam, SimRequest};
pub use ruleset::{ProtectedResource, RuleSet, RuleSetError};
