//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (wire request → SimRequest, body limit)
//!     → [decision engine]
//!     → response.rs (Decision → status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestError, X_REQUEST_ID};
pub use response::{RenderContext, ResponseComposer};
pub use server::{AppState, HttpServer, ServerError};
