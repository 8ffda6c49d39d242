//! Decision to HTTP response.
//!
//! # Responsibilities
//! - Map the outcome to a status (ALLOW → 200, BLOCK → 403)
//! - Render an HTML or JSON body describing the decision
//! - Add the simulator identity headers (`Server`, `X-Bypass-Reason`)
//! - Add WAF block headers and a synthetic ray ID on WAF blocks
//!
//! # Design Decisions
//! - Presentation only: nothing here feeds back into the decision
//! - Reflected request data is HTML-escaped
//! - A configured header value that is not a valid header is skipped, not fatal
//! - HEAD responses keep status and headers but carry no body

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use html_escape::encode_safe;
use serde::Serialize;
use uuid::Uuid;

use crate::config::schema::{BodyFormat, ResponseConfig};
use crate::engine::decision::{Decision, Outcome, ReasonKind};

pub const X_BYPASS_REASON: &str = "x-bypass-reason";
pub const X_WAF_BLOCK: &str = "x-waf-block";
pub const X_WAF_RULE: &str = "x-waf-rule";

/// Request facts the renderer needs besides the decision.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub method: &'a Method,
    /// Path as received, echoed back in the body.
    pub path: &'a str,
    pub wants_json: bool,
}

#[derive(Serialize)]
struct DecisionBody<'a> {
    #[serde(flatten)]
    decision: &'a Decision,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ray_id: Option<&'a str>,
}

/// Renders decisions into responses.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    config: ResponseConfig,
}

impl ResponseComposer {
    pub fn new(config: ResponseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResponseConfig {
        &self.config
    }

    pub fn compose(&self, decision: &Decision, ctx: &RenderContext<'_>) -> Response {
        let status = match decision.outcome {
            Outcome::Allow => StatusCode::OK,
            Outcome::Block => StatusCode::FORBIDDEN,
        };
        let waf_block = decision.reason == ReasonKind::WafBlocked;
        let ray_id = waf_block.then(new_ray_id);

        let mut headers = HeaderMap::new();
        let server = match (&self.config.waf_server_header, waf_block) {
            (Some(waf_server), true) => waf_server.as_str(),
            _ => self.config.server_header.as_str(),
        };
        insert(&mut headers, header::SERVER, server);
        insert(
            &mut headers,
            HeaderName::from_static(X_BYPASS_REASON),
            decision.reason.as_str(),
        );

        if waf_block {
            insert(&mut headers, HeaderName::from_static(X_WAF_BLOCK), "true");
            if let Some(rule) = &decision.matched_pattern {
                insert(&mut headers, HeaderName::from_static(X_WAF_RULE), rule);
            }
            if let (Some(ray), Ok(name)) = (
                &ray_id,
                HeaderName::from_bytes(self.config.ray_header.as_bytes()),
            ) {
                insert(&mut headers, name, ray);
            }
        }

        let json = ctx.wants_json || self.config.format == BodyFormat::Json;
        let content_type = if json {
            "application/json"
        } else {
            "text/html; charset=utf-8"
        };
        insert(&mut headers, header::CONTENT_TYPE, content_type);

        if *ctx.method == Method::HEAD {
            return (status, headers, Body::empty()).into_response();
        }

        let body = if json {
            let rendered = DecisionBody {
                decision,
                path: ctx.path,
                ray_id: ray_id.as_deref(),
            };
            serde_json::to_string(&rendered).unwrap_or_else(|_| String::from("{}"))
        } else {
            render_html(decision, ctx.path, ray_id.as_deref())
        };

        (status, headers, body).into_response()
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            tracing::warn!(header = %name, value = %value, "Skipping invalid response header value");
        }
    }
}

/// 16 lowercase hex digits, in the style of a CDN ray ID.
fn new_ray_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

fn render_html(decision: &Decision, path: &str, ray_id: Option<&str>) -> String {
    let (title, heading) = match (decision.outcome, decision.reason) {
        (Outcome::Block, ReasonKind::WafBlocked) => ("403 Forbidden", "Request Blocked"),
        (Outcome::Block, _) => ("403 Forbidden", "Access Denied"),
        (Outcome::Allow, ReasonKind::Default) => ("200 OK", "Page Accessed"),
        (Outcome::Allow, _) => ("200 OK", "Access Granted"),
    };

    let mut details = vec![
        format!("<p>Path: {}</p>", encode_safe(path)),
        format!("<p>Reason: {}</p>", decision.reason),
    ];
    if let Some(resource) = &decision.resource {
        details.push(format!("<p>Resource: {}</p>", encode_safe(resource)));
    }
    if let Some(rule) = &decision.matched_pattern {
        details.push(format!("<p>Rule triggered: {}</p>", encode_safe(rule)));
    }
    if let Some(header) = &decision.matched_header {
        details.push(format!("<p>Header: {}</p>", encode_safe(header)));
    }
    if !decision.missing_grants.is_empty() {
        let missing: Vec<&str> = decision.missing_grants.iter().map(|k| k.as_str()).collect();
        details.push(format!("<p>Missing: {}</p>", missing.join(", ")));
    }
    if let Some(ray) = ray_id {
        details.push(format!("<p><small>Ray ID: {ray}</small></p>"));
    }

    format!(
        "<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{heading}</h1>\n{}\n</body>\n</html>\n",
        details.join("\n")
    )
}
