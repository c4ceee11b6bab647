//! HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::router::Router;
use crate::transport::{Inbound, ReceiveFn, Scope};

/// HTTP request methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
    /// Any other method, upper-cased.
    Other(String),
}

impl Method {
    /// Parses a method, ignoring case.
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Other(s) => s,
        }
    }

    /// Case-insensitive comparison against a raw method string.
    pub fn matches(&self, raw: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(raw)
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A converted path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
}

impl ParamValue {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::from(s.as_str()),
            Self::Int(i) => serde_json::Value::from(*i),
        }
    }
}

/// Typed path parameters extracted from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, ParamValue>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.params.insert(key.into(), value);
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Gets a text parameter.
    pub fn str(&self, key: &str) -> Option<&str> {
        match self.params.get(key)? {
            ParamValue::Str(s) => Some(s),
            ParamValue::Int(_) => None,
        }
    }

    /// Gets an integer parameter.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.params.get(key)? {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Str(_) => None,
        }
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns whether no parameters were captured.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Deserializes the parameters into a typed record.
    ///
    /// ```ignore
    /// #[derive(Deserialize)]
    /// struct ItemPath { id: i64 }
    ///
    /// let path: ItemPath = params.deserialize()?;
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map))
    }
}

/// An HTTP request.
///
/// Wraps the transport scope and reads the body lazily on first access.
pub struct Request {
    scope: Scope,
    receive: ReceiveFn,
    body: Option<Vec<u8>>,
    router: Option<Arc<Router>>,
}

impl Request {
    /// Creates a request over a scope and its receive capability.
    pub fn new(scope: Scope, receive: ReceiveFn) -> Self {
        Self {
            scope,
            receive,
            body: None,
            router: None,
        }
    }

    /// Attaches the router that dispatched this request.
    #[must_use]
    pub fn with_router(mut self, router: Arc<Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Returns the router that dispatched this request, if any.
    pub fn router(&self) -> Option<&Router> {
        self.router.as_deref()
    }

    /// Returns the upper-cased method.
    pub fn method(&self) -> String {
        self.scope.method_upper()
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.scope.path
    }

    /// Returns the peer address, if known.
    pub fn client(&self) -> Option<SocketAddr> {
        self.scope.client
    }

    /// Returns the underlying scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns a value stored in the per-request state by middleware.
    pub fn state(&self, key: &str) -> Option<&serde_json::Value> {
        self.scope.state.get(key)
    }

    /// Headers keyed by lower-cased name.
    ///
    /// Rebuilt on every call; a repeated header keeps its last value.
    pub fn headers(&self) -> HashMap<String, String> {
        self.scope
            .headers
            .iter()
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(k).to_lowercase(),
                    String::from_utf8_lossy(v).into_owned(),
                )
            })
            .collect()
    }

    /// Gets a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.scope.header_value(name)
    }

    /// Query parameters parsed from the raw query string.
    ///
    /// Values are not percent-decoded. A bare `key` maps to `""`; a repeated
    /// key keeps its last value.
    pub fn query_params(&self) -> HashMap<String, String> {
        parse_query_string(&String::from_utf8_lossy(&self.scope.query_string))
    }

    /// Reads the whole body, draining the transport on first use.
    pub async fn body(&mut self) -> &[u8] {
        if self.body.is_none() {
            let mut buf = Vec::new();
            loop {
                match (self.receive)().await {
                    Inbound::Body { body, more_body } => {
                        buf.extend_from_slice(&body);
                        if !more_body {
                            break;
                        }
                    }
                    Inbound::Disconnect => break,
                }
            }
            self.body = Some(buf);
        }
        self.body.as_deref().unwrap_or_default()
    }

    /// Returns the body as a string.
    pub async fn text(&mut self) -> String {
        String::from_utf8_lossy(self.body().await).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// An empty body yields `Ok(None)` rather than a parse error.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<Option<T>, serde_json::Error> {
        let body = self.body().await;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(body).map(Some)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.scope.method)
            .field("path", &self.scope.path)
            .field("body_read", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

/// Parses query parameters from a raw query string.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
