//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with one catch-all decision handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind the server to a listener
//! - Hand every request to the decision engine, fail-closed
//! - Record metrics and a decision log line per request

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::SimulatorConfig;
use crate::engine::{DecisionEngine, RuleSet, RuleSetError};
use crate::http::request::{self, into_sim_request, request_id_header, wants_json};
use crate::http::response::{RenderContext, ResponseComposer};
use crate::lifecycle::ShutdownSignal;
use crate::observability::{logging, metrics};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: DecisionEngine,
    pub composer: Arc<ResponseComposer>,
    pub max_body_bytes: usize,
}

/// HTTP front end of the simulator.
pub struct HttpServer {
    router: Router,
    config: SimulatorConfig,
}

impl HttpServer {
    /// Compile the rule set from `config` and build the server.
    pub fn new(config: SimulatorConfig) -> Result<Self, RuleSetError> {
        let rules = Arc::new(RuleSet::from_config(&config)?);
        Ok(Self::with_rules(config, rules))
    }

    /// Build the server around an already compiled rule set.
    pub fn with_rules(config: SimulatorConfig, rules: Arc<RuleSet>) -> Self {
        let state = AppState {
            engine: DecisionEngine::new(rules),
            composer: Arc::new(ResponseComposer::new(config.response.clone())),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &SimulatorConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(decision_handler))
            .route("/", any(decision_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request::request_id(req),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }))
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuid))
    }

    /// Bind a listener on the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.listener.bind_address.clone();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// A clone of the router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(
            address = %addr,
            resources = self.config.resources.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.recv())
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

/// Catch-all handler: every method, every path.
async fn decision_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let request_id = request::request_id(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let json = wants_json(&req);

    let sim = match into_sim_request(req, state.max_body_bytes).await {
        Ok(sim) => sim,
        Err(err) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %err, "Rejecting request");
            return (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()).into_response();
        }
    };

    let decision = state.engine.decide_fail_closed(&sim);
    metrics::record_decision(&decision);
    logging::log_decision(&request_id, method.as_str(), &path, &decision);

    state.composer.compose(
        &decision,
        &RenderContext {
            method: &method,
            path: &path,
            wants_json: json,
        },
    )
}
