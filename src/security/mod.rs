//! Security primitives the decision engine is built from.
//!
//! # Data Flow
//! ```text
//! Raw request path:
//!     → canonical.rs (decode once, fold case, resolve dots, strip slashes)
//!
//! Decoded path, query and body:
//!     → blocklist.rs (ordered, case-insensitive pattern scan)
//!
//! Header map:
//!     → header_policy.rs (forwarded IP, URL override, Host grants)
//! ```
//!
//! # Design Decisions
//! - Every primitive is a pure function of its input
//! - Nothing here decides ALLOW or BLOCK; the engine combines the results

pub mod blocklist;
pub mod canonical;
pub mod header_policy;

pub use blocklist::{BlockMatch, BlockRule, PatternBlocklist, RegexCompileError, DEFAULT_RULES};
pub use canonical::{canonicalize, CanonicalPath};
pub use header_policy::{HeaderGrant, HeaderPolicyEvaluator};
