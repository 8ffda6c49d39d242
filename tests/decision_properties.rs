//! Engine-level properties that must hold for every request.

use std::sync::Arc;

use axum::http::Method;
use bypass_sim::config::{parse_config, ResourceConfig, SimulatorConfig, UnlockPolicy};
use bypass_sim::engine::{DecisionEngine, Outcome, ReasonKind, RuleSet, SimRequest};
use bypass_sim::security::canonicalize;

fn default_engine() -> DecisionEngine {
    DecisionEngine::new(Arc::new(
        RuleSet::from_config(&SimulatorConfig::default()).unwrap(),
    ))
}

/// Targets covering every branch of the evaluation chain.
const TARGETS: &[&str] = &[
    "/",
    "/admin",
    "/admin/",
    "/admin//",
    "/ADMIN",
    "/%61dmin",
    "/%2561dmin",
    "/%41DMIN/./",
    "/./admin",
    "/admin/.",
    "/a/../admin",
    "/restricted",
    "/combined",
    "/combined/",
    "/public?q=<script>",
    "/public?q=%3Cscript%3E",
    "/public?q=%253Cscript%253E",
    "/search?id=1%20union%20select%202",
    "/adm%zzin",
    "/admin%",
    "/%FF%FE",
];

const HEADER_SETS: &[&[(&str, &str)]] = &[
    &[],
    &[("X-Forwarded-For", "127.0.0.1")],
    &[("X-Forwarded-For", "10.0.0.1")],
    &[("X-Original-URL", "/allowed")],
    &[("Host", "localhost")],
    &[("X-Forwarded-For", "::1"), ("X-Rewrite-URL", "/admin")],
];

fn requests() -> Vec<SimRequest> {
    let mut out = Vec::new();
    for target in TARGETS {
        for headers in HEADER_SETS {
            let mut request = SimRequest::get(target);
            for (name, value) in *headers {
                request = request.with_header(name, value);
            }
            out.push(request);
        }
    }
    out
}

#[test]
fn test_decisions_are_deterministic() {
    let engine = default_engine();
    let other = default_engine();
    for request in requests() {
        let first = engine.decide(&request);
        assert_eq!(first, engine.decide(&request), "{request:?}");
        assert_eq!(first, other.decide(&request), "{request:?}");
        assert_eq!(first, engine.decide_fail_closed(&request), "{request:?}");
    }
}

#[test]
fn test_outcome_and_reason_agree() {
    for request in requests() {
        let decision = default_engine().decide(&request);
        let blocking = matches!(
            decision.reason,
            ReasonKind::WafBlocked | ReasonKind::Protected | ReasonKind::EvaluationFault
        );
        assert_eq!(decision.outcome == Outcome::Block, blocking, "{request:?} → {decision:?}");
        assert_ne!(decision.reason, ReasonKind::None);

        if decision.reason == ReasonKind::WafBlocked {
            assert!(decision.matched_pattern.is_some());
        }
        if decision.matched_header.is_some() {
            assert_eq!(decision.outcome, Outcome::Allow);
        }
    }
}

#[test]
fn test_waf_hit_dominates_every_grant() {
    let engine = default_engine();
    for headers in HEADER_SETS {
        let mut request = SimRequest::get("/admin?q=<script>");
        for (name, value) in *headers {
            request = request.with_header(name, value);
        }
        let decision = engine.decide(&request);
        assert_eq!(decision.reason, ReasonKind::WafBlocked, "{headers:?}");
    }
}

#[test]
fn test_headers_never_open_unprotected_paths_further() {
    let engine = default_engine();
    for headers in HEADER_SETS {
        let mut request = SimRequest::get("/public/page");
        for (name, value) in *headers {
            request = request.with_header(name, value);
        }
        assert_eq!(engine.decide(&request).reason, ReasonKind::Default);
    }
}

#[test]
fn test_canonical_form_is_a_fixpoint() {
    for target in TARGETS {
        let first = canonicalize(target);
        let second = canonicalize(first.canonical());
        assert_eq!(first.canonical(), second.canonical(), "{target}");
    }
}

#[test]
fn test_body_inspection_follows_method() {
    let engine = default_engine();
    let payload = "q=%3Cscript%3Ealert(1)%3C%2Fscript%3E";

    for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        let request = SimRequest::new(method.clone(), "/submit").with_body(payload);
        assert_eq!(engine.decide(&request).reason, ReasonKind::WafBlocked, "{method}");
    }
    for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
        let request = SimRequest::new(method.clone(), "/submit").with_body(payload);
        assert_eq!(engine.decide(&request).reason, ReasonKind::Default, "{method}");
    }
}

#[test]
fn test_concurrent_evaluation_shares_one_rule_set() {
    let engine = default_engine();
    let expected: Vec<_> = requests().iter().map(|r| engine.decide(r)).collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || requests().iter().map(|r| engine.decide(r)).collect::<Vec<_>>())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_configured_rule_set_from_toml() {
    let config = parse_config(
        r#"
        [waf]
        include_defaults = false

        [[waf.rules]]
        label = "secret_param"
        pattern = "token="

        [[resources]]
        path = "/internal"
        unlock = { all = ["host"] }
        "#,
    )
    .unwrap();
    let engine = DecisionEngine::new(Arc::new(RuleSet::from_config(&config).unwrap()));

    let d = engine.decide(&SimRequest::get("/x?TOKEN=abc"));
    assert_eq!(d.matched_pattern.as_deref(), Some("secret_param"));

    // built-in rules are gone
    let d = engine.decide(&SimRequest::get("/x?q=<script>"));
    assert_eq!(d.outcome, Outcome::Allow);

    let d = engine.decide(&SimRequest::get("/internal").with_header("X-Forwarded-For", "127.0.0.1"));
    assert_eq!(d.outcome, Outcome::Block);

    let d = engine.decide(&SimRequest::get("/internal").with_header("Host", "LOCALHOST"));
    assert_eq!(d.reason, ReasonKind::HostHeaderBypass);
}

#[test]
fn test_every_resource_blocks_exactly_and_opens_with_a_slash() {
    let engine = default_engine();
    for resource in SimulatorConfig::default().resources {
        let d = engine.decide(&SimRequest::get(&resource.path));
        assert_eq!((d.outcome, d.reason), (Outcome::Block, ReasonKind::Protected), "{}", resource.path);

        let d = engine.decide(&SimRequest::get(&format!("{}/", resource.path)));
        assert_eq!(
            (d.outcome, d.reason),
            (Outcome::Allow, ReasonKind::TrailingSlashBypass),
            "{}",
            resource.path
        );
    }
}

#[test]
fn test_mixed_case_resources_are_reached_by_every_variant() {
    let mut config = SimulatorConfig::default();
    config.resources = ["/Admin", "/Secret/Panel", "/API/v2/Keys", "/ops"]
        .into_iter()
        .map(|path| ResourceConfig::new(path, UnlockPolicy::Any))
        .collect();
    let engine = DecisionEngine::new(Arc::new(RuleSet::from_config(&config).unwrap()));

    for resource in &config.resources {
        let path = resource.path.as_str();
        let d = engine.decide(&SimRequest::get(path));
        assert_eq!((d.outcome, d.reason), (Outcome::Block, ReasonKind::Protected), "{path}");

        let lower = path.to_ascii_lowercase();
        let upper = path.to_ascii_uppercase();
        for variant in [lower.as_str(), upper.as_str()] {
            if variant == path {
                continue;
            }
            let d = engine.decide(&SimRequest::get(variant));
            assert_eq!((d.outcome, d.reason), (Outcome::Allow, ReasonKind::CaseBypass), "{variant}");
            assert_eq!(d.resource.as_deref(), Some(path), "{variant}");
        }

        for variant in [format!("{path}/"), format!("{lower}/"), format!("{upper}/")] {
            let d = engine.decide(&SimRequest::get(&variant));
            assert_eq!(d.outcome, Outcome::Allow, "{variant}");
            assert_eq!(d.resource.as_deref(), Some(path), "{variant}");
        }
    }
}

fn percent_encode_all(text: &str) -> String {
    text.bytes().map(|b| format!("%{b:02X}")).collect()
}

#[test]
fn test_every_default_rule_fires_literal_and_encoded() {
    let samples = [
        ("path_traversal", "../etc/passwd"),
        ("script_tag", "<script>alert(1)"),
        ("sql_union_select", "1 union select 2"),
        ("sql_drop_table", "1; drop table users"),
        ("code_exec", "eval(payload)"),
        ("iframe_tag", "<iframe src=x>"),
        ("javascript_scheme", "javascript:alert(1)"),
        ("event_handler", "<img src=x onerror=alert(1)>"),
    ];
    let engine = default_engine();

    for (label, payload) in samples {
        for target in [format!("/x/{payload}"), format!("/x/{}", percent_encode_all(payload))] {
            let d = engine.decide(&SimRequest::get(&target));
            assert_eq!(d.reason, ReasonKind::WafBlocked, "{target}");
            assert_eq!(d.matched_pattern.as_deref(), Some(label), "{target}");
        }
    }
}
