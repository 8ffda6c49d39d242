//! The decision engine.
//!
//! # Evaluation Order
//! ```text
//! SimRequest
//!     → 1. WAF: blocklist over decoded path+query (then raw), then body
//!          hit → BLOCK / waf_blocked
//!     → 2. exact raw match on a protected resource → 3..5
//!          no exact match, but one canonicalization step matches
//!          → ALLOW / encoding | case | dot_segment | trailing_slash
//!     → 3. no header grant             → BLOCK / protected
//!     → 4. grant present (ip > url_override > host) → ALLOW / header_*
//!     → 5. combined protection: all required grants → ALLOW,
//!          otherwise BLOCK / protected + missing grants
//!     → 6. nothing matched             → ALLOW / default
//! ```
//!
//! # Design Decisions
//! - Pure function of (request, rule set); no clock, no shared mutable state
//! - First applicable step wins; the order above is total
//! - Single-step attribution precedence: encoding > case > dot > slash
//! - A panic during evaluation degrades to BLOCK (fail closed)

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::schema::UnlockPolicy;
use crate::engine::decision::{Decision, GrantKind, ReasonKind};
use crate::engine::request::SimRequest;
use crate::engine::ruleset::{ProtectedResource, RuleSet};
use crate::security::blocklist::BlockMatch;
use crate::security::canonical::{
    canonicalize, fold_case, form_decode_once, percent_decode_once, resolve_dot_segments,
    strip_trailing_slash, CanonicalPath,
};
use crate::security::header_policy::HeaderGrant;

/// Evaluates requests against a shared, immutable [`RuleSet`].
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    rules: Arc<RuleSet>,
}

impl DecisionEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate one request.
    pub fn decide(&self, request: &SimRequest) -> Decision {
        decide(request, &self.rules)
    }

    /// Evaluate one request; any panic during evaluation yields BLOCK.
    pub fn decide_fail_closed(&self, request: &SimRequest) -> Decision {
        fail_closed(|| self.decide(request))
    }
}

/// Produce the decision for `request` under `rules`.
pub fn decide(request: &SimRequest, rules: &RuleSet) -> Decision {
    let canonical = canonicalize(&request.raw_path);

    if let Some(hit) = waf_check(request, &canonical, rules) {
        return Decision::block(ReasonKind::WafBlocked).with_pattern(hit.label);
    }

    if let Some(resource) = rules
        .resources()
        .iter()
        .find(|resource| resource.path() == canonical.raw)
    {
        let grants = rules.header_policy().evaluate(&request.headers);
        return guard_resource(resource, &grants);
    }

    if let Some((resource, reason)) = find_path_bypass(&canonical, rules.resources()) {
        return Decision::allow(reason).with_resource(resource.path());
    }

    Decision::allow(ReasonKind::Default)
}

/// Run an evaluation, turning a panic into a BLOCK.
fn fail_closed(evaluate: impl FnOnce() -> Decision) -> Decision {
    match panic::catch_unwind(AssertUnwindSafe(evaluate)) {
        Ok(decision) => decision,
        Err(_) => {
            tracing::error!("decision evaluation panicked, failing closed");
            Decision::block(ReasonKind::EvaluationFault)
        }
    }
}

/// Step 1: scan the URL, then the body of state-changing requests.
fn waf_check(request: &SimRequest, canonical: &CanonicalPath, rules: &RuleSet) -> Option<BlockMatch> {
    if !rules.waf_enabled() {
        return None;
    }

    let raw_query = request.raw_query();
    let mut decoded_target = canonical.decoded.clone();
    let mut raw_target = canonical.raw.clone();
    if !raw_query.is_empty() {
        decoded_target.push('?');
        decoded_target.push_str(&form_decode_once(&raw_query));
        raw_target.push('?');
        raw_target.push_str(&raw_query);
    }

    let mut texts = vec![decoded_target];
    if raw_target != texts[0] {
        texts.push(raw_target);
    }

    if rules.inspect_body() && request.is_state_changing() && !request.body.is_empty() {
        let raw_body = String::from_utf8_lossy(&request.body).into_owned();
        let decoded_body = form_decode_once(&raw_body);
        if decoded_body != raw_body {
            texts.push(decoded_body);
        }
        texts.push(raw_body);
    }

    let blocklist = rules.blocklist();
    texts.iter().find_map(|text| blocklist.find_match(text))
}

/// Steps 3 to 5 for a request that hit a protected path exactly.
fn guard_resource(resource: &ProtectedResource, grants: &[HeaderGrant]) -> Decision {
    let protected = || Decision::block(ReasonKind::Protected).with_resource(resource.path());

    let granted = match resource.unlock() {
        UnlockPolicy::None => None,
        UnlockPolicy::Any => strongest(grants.iter()),
        UnlockPolicy::All(required) => {
            let missing: Vec<GrantKind> = required
                .iter()
                .copied()
                .filter(|kind| !grants.iter().any(|grant| grant.kind() == *kind))
                .collect();
            if !missing.is_empty() {
                return protected().with_missing(missing);
            }
            strongest(grants.iter().filter(|grant| required.contains(&grant.kind())))
        }
    };

    match granted {
        Some(grant) => Decision::allow(grant.kind().bypass_reason())
            .with_header(grant.describe())
            .with_resource(resource.path()),
        None => protected(),
    }
}

/// Highest-precedence grant: IP over URL override over Host.
fn strongest<'a>(grants: impl Iterator<Item = &'a HeaderGrant>) -> Option<&'a HeaderGrant> {
    grants.min_by_key(|grant| grant.kind())
}

/// How a canonicalization step's output is compared with a resource path.
#[derive(Clone, Copy)]
enum Comparison {
    Exact,
    Folded,
}

/// Step 2: attribute a non-exact match to the canonicalization step behind it.
fn find_path_bypass<'a>(
    canonical: &CanonicalPath,
    resources: &'a [ProtectedResource],
) -> Option<(&'a ProtectedResource, ReasonKind)> {
    let raw = canonical.raw.as_str();
    let decoded = percent_decode_once(raw);
    let folded = fold_case(raw);
    let dot_resolved = resolve_dot_segments(raw);
    let stripped = strip_trailing_slash(raw);

    let single_steps = [
        (ReasonKind::EncodingBypass, &*decoded, Comparison::Exact),
        (ReasonKind::CaseBypass, folded.as_str(), Comparison::Folded),
        (ReasonKind::DotSegmentBypass, dot_resolved.as_str(), Comparison::Exact),
        (ReasonKind::TrailingSlashBypass, stripped, Comparison::Exact),
    ];

    for (reason, candidate, comparison) in single_steps {
        let matched = resources.iter().find(|resource| match comparison {
            Comparison::Exact => candidate != raw && resource.path() == candidate,
            // folding both sides: an already-lowercase request still differs
            // from a resource configured with capitals
            Comparison::Folded => resource.folded() == candidate && resource.path() != raw,
        });
        if let Some(resource) = matched {
            return Some((resource, reason));
        }
    }

    // No single step suffices; the full pipeline may still reach a resource.
    let resource = resources
        .iter()
        .find(|resource| resource.folded() == canonical.canonical())?;
    first_changing_step(canonical).map(|reason| (resource, reason))
}

/// The highest-precedence step that altered the path on its way to canonical.
fn first_changing_step(canonical: &CanonicalPath) -> Option<ReasonKind> {
    let steps = [
        (ReasonKind::EncodingBypass, &canonical.raw, &canonical.decoded),
        (ReasonKind::CaseBypass, &canonical.decoded, &canonical.case_folded),
        (ReasonKind::DotSegmentBypass, &canonical.case_folded, &canonical.dot_resolved),
        (
            ReasonKind::TrailingSlashBypass,
            &canonical.dot_resolved,
            &canonical.trailing_slash_stripped,
        ),
    ];

    steps
        .into_iter()
        .find(|(_, before, after)| before != after)
        .map(|(reason, _, _)| reason)
}
