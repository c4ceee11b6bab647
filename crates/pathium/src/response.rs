//! HTTP response type and handler result coercion.

use serde::Serialize;

use crate::transport::RawHeaders;

/// Media type attached to JSON bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json; charset=utf-8";

/// Media type attached to text bodies.
pub const TEXT_MEDIA_TYPE: &str = "text/plain; charset=utf-8";

/// Media type attached to HTML bodies.
pub const HTML_MEDIA_TYPE: &str = "text/html; charset=utf-8";

/// The body forms a [`Response`] can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Raw bytes; no content-type unless a media type is given.
    Bytes(Vec<u8>),
    /// Text; `text/plain` unless a media type is given.
    Text(String),
    /// A structured value, serialized as JSON.
    Json(serde_json::Value),
    /// No body.
    Empty,
}

impl From<Vec<u8>> for Content {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for Content {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Content {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Empty,
            other => Self::Json(other),
        }
    }
}

impl From<()> for Content {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Builds a response from any body form.
    ///
    /// The content-type is inferred from the form: JSON values get
    /// [`JSON_MEDIA_TYPE`], text gets `media_type` or [`TEXT_MEDIA_TYPE`],
    /// bytes and empty bodies get `media_type` if one is given. Nothing is
    /// appended when `headers` already carries a content-type.
    pub fn new(
        content: impl Into<Content>,
        status: u16,
        headers: Vec<(String, String)>,
        media_type: Option<&str>,
    ) -> Self {
        let (body, inferred) = match content.into() {
            Content::Json(value) => (value.to_string().into_bytes(), Some(JSON_MEDIA_TYPE)),
            Content::Text(text) => (text.into_bytes(), Some(media_type.unwrap_or(TEXT_MEDIA_TYPE))),
            Content::Bytes(bytes) => (bytes, media_type),
            Content::Empty => (Vec::new(), media_type),
        };

        let mut res = Self {
            status,
            headers,
            body,
        };
        if let Some(content_type) = inferred {
            if res.get_header("content-type").is_none() {
                res.headers
                    .push(("content-type".to_string(), content_type.to_string()));
            }
        }
        res
    }

    /// Creates an empty response with the given status.
    pub fn empty(status: u16) -> Self {
        Self::new(Content::Empty, status, Vec::new(), None)
    }

    /// Creates an empty 200 OK response.
    pub fn ok() -> Self {
        Self::empty(200)
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(Content::Text(body.into()), 200, Vec::new(), None)
    }

    /// Creates a response with HTML content.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(Content::Text(body.into()), 200, Vec::new(), Some(HTML_MEDIA_TYPE))
    }

    /// Creates a response with raw bytes and an explicit media type.
    pub fn bytes(body: impl Into<Vec<u8>>, media_type: &str) -> Self {
        Self::new(Content::Bytes(body.into()), 200, Vec::new(), Some(media_type))
    }

    /// Creates a response with JSON content.
    ///
    /// A value that fails to serialize produces a 500 response.
    pub fn json<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::new(Content::Json(value), 200, Vec::new(), None),
            Err(_) => Self::internal_server_error(),
        }
    }

    /// Creates a JSON `{"detail": ...}` error response.
    pub fn detail(status: u16, detail: &str) -> Self {
        Self::json(&serde_json::json!({ "detail": detail })).with_status(status)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::text("Not Found").with_status(404)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_server_error() -> Self {
        Self::new(
            Content::Json(serde_json::json!({ "detail": "Internal Server Error" })),
            500,
            Vec::new(),
            None,
        )
    }

    /// Creates a redirect response.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::empty(302).header("location", url)
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Gets the first header value with this name, case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Encodes the headers as raw byte pairs for the transport.
    pub fn raw_headers(&self) -> RawHeaders {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

/// A JSON body from any serializable value.
///
/// ```ignore
/// async fn get_user(_req: Request, _params: PathParams) -> Result<Json<User>, Failure> {
///     Ok(Json(User { id: 1, name: "alice".into() }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// Conversion of handler results into a [`Response`].
///
/// A handler may return a ready [`Response`] or any type implementing this
/// trait; the latter goes through the generic-content constructor.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Content {
    fn into_response(self) -> Response {
        Response::new(self, 200, Vec::new(), None)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Content::from(self).into_response()
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Content::from(self).into_response()
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        Content::from(self).into_response()
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Response {
        Content::from(self).into_response()
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Content::Empty.into_response()
    }
}

impl<T: IntoResponse> IntoResponse for Option<T> {
    fn into_response(self) -> Response {
        match self {
            Some(inner) => inner.into_response(),
            None => Content::Empty.into_response(),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        Response::json(&self.0)
    }
}
