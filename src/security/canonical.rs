//! Path canonicalization.
//!
//! # Responsibilities
//! - Strip the query component from a request target
//! - Percent-decode exactly once (never recursively)
//! - Fold case, resolve `.` segments, strip trailing slashes
//! - Keep every intermediate form so bypass attribution can compare them
//!
//! # Design Decisions
//! - Steps run in a fixed order; each one consumes the previous output
//! - Malformed escapes stay verbatim: canonicalization never fails
//! - `%25` is never decoded, so the decoded form is a fixpoint of decoding
//! - `..` segments are left alone; traversal is a blocklist concern

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// The escape for a literal `%`. Kept encoded so double-encoded payloads
/// (`%2561`) stay distinct from their single-encoded form.
const ENCODED_PERCENT: &str = "%25";

/// Every form a raw request path goes through on its way to canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath {
    /// Path as received, query removed.
    pub raw: String,
    /// `raw` percent-decoded once, original case retained.
    pub decoded: String,
    /// `decoded` folded to lowercase.
    pub case_folded: String,
    /// `case_folded` with `.` segments removed.
    pub dot_resolved: String,
    /// `dot_resolved` without trailing slashes.
    pub trailing_slash_stripped: String,
    /// Whether `dot_resolved` ended with `/` (root excluded).
    pub had_trailing_slash: bool,
}

impl CanonicalPath {
    /// The fully canonical form used for comparisons.
    pub fn canonical(&self) -> &str {
        &self.trailing_slash_stripped
    }
}

/// Canonicalize a raw request path (a full request target is accepted too).
pub fn canonicalize(raw_path: &str) -> CanonicalPath {
    let raw = strip_query(raw_path);
    let decoded = percent_decode_once(raw).into_owned();
    let case_folded = fold_case(&decoded);
    let dot_resolved = resolve_dot_segments(&case_folded);
    let trailing_slash_stripped = strip_trailing_slash(&dot_resolved).to_string();
    let had_trailing_slash = trailing_slash_stripped.len() < dot_resolved.len();

    CanonicalPath {
        raw: raw.to_string(),
        decoded,
        case_folded,
        dot_resolved,
        trailing_slash_stripped,
        had_trailing_slash,
    }
}

/// Drop everything from the first `?` onwards.
pub fn strip_query(target: &str) -> &str {
    match target.split_once('?') {
        Some((path, _)) => path,
        None => target,
    }
}

/// Decode every `%XX` escape once.
///
/// `%25` is preserved, malformed escapes are kept as literal text and
/// invalid UTF-8 is replaced lossily. A literal `%` that would form a
/// decodable escape in the output is re-encoded, so decoding the result
/// again is a no-op.
pub fn percent_decode_once(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let decoded = input
        .split(ENCODED_PERCENT)
        .map(|piece| percent_decode_str(piece).decode_utf8_lossy())
        .collect::<Vec<_>>()
        .join(ENCODED_PERCENT);

    Cow::Owned(escape_residual_percents(&decoded))
}

/// Decode a form-encoded component (`+` is a space) once.
pub fn form_decode_once(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_once(&spaced).into_owned()
}

/// Lowercase for case-insensitive comparison.
pub fn fold_case(path: &str) -> String {
    path.to_lowercase()
}

/// Remove single-dot segments. `..` is not touched.
pub fn resolve_dot_segments(path: &str) -> String {
    if !path.split('/').any(|segment| segment == ".") {
        return path.to_string();
    }

    let keeps_trailing_slash = path.ends_with("/.");
    let mut resolved = path
        .split('/')
        .filter(|segment| *segment != ".")
        .collect::<Vec<_>>()
        .join("/");

    if keeps_trailing_slash && !resolved.ends_with('/') {
        resolved.push('/');
    }
    if path.starts_with('/') && !resolved.starts_with('/') {
        resolved.insert(0, '/');
    }
    resolved
}

/// Strip all trailing slashes, leaving the root as `/`.
pub fn strip_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Re-encode any `%` followed by two hex digits, other than `%25` itself.
fn escape_residual_percents(decoded: &str) -> String {
    let bytes = decoded.as_bytes();
    let mut out = String::with_capacity(decoded.len());

    for (i, ch) in decoded.char_indices() {
        out.push(ch);
        if ch != '%' {
            continue;
        }
        let next = bytes.get(i + 1..i + 3);
        if let Some(pair) = next {
            if pair.iter().all(u8::is_ascii_hexdigit) && pair != b"25" {
                out.push_str("25");
            }
        }
    }
    out
}
