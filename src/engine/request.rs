//! The request model the engine evaluates.
//!
//! The transport builds one of these per incoming request; the engine never
//! sees wire bytes.

use std::collections::BTreeMap;

use axum::http::Method;

/// Header map with case-insensitive names; a repeated name keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        self.entries.insert(
            name.to_ascii_lowercase(),
            (name.to_string(), value.into()),
        );
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Headers as `(name as received, value)`, ordered by lowercased name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// One query parameter exactly as it appeared on the wire (undecoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: String,
    pub value: Option<String>,
}

impl QueryParam {
    fn to_raw(&self) -> String {
        match &self.value {
            Some(value) => format!("{}={}", self.name, value),
            None => self.name.clone(),
        }
    }
}

/// Split a raw query string into ordered, undecoded parameters.
pub fn parse_query(raw: &str) -> Vec<QueryParam> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => QueryParam {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => QueryParam {
                name: pair.to_string(),
                value: None,
            },
        })
        .collect()
}

/// A fully parsed request, immutable for the duration of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimRequest {
    pub method: Method,
    /// Path as received, without the query.
    pub raw_path: String,
    pub query: Vec<QueryParam>,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl SimRequest {
    /// Build a request from a method and a request target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };

        Self {
            method,
            raw_path: path.to_string(),
            query,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The query re-assembled in its original order, still undecoded.
    pub fn raw_query(&self) -> String {
        self.query
            .iter()
            .map(QueryParam::to_raw)
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Whether the method is one whose body the WAF inspects.
    pub fn is_state_changing(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }
}
