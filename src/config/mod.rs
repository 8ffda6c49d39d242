//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SimulatorConfig (validated, immutable)
//!     → compiled once into a RuleSet shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BlockRuleConfig, BodyFormat, HeaderPolicyConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ResourceConfig, ResponseConfig, SimulatorConfig, UnlockPolicy,
    WafConfig,
};
