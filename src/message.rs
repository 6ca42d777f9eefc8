//! Request and response messages.
//!
//! A [`Request`] is immutable once constructed: the `with_*` combinators
//! return a new value rather than mutating in place, so a request captured by
//! one call can never be altered by another.

use std::fmt;

use crate::body::Body;
use crate::headers::Headers;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    /// The wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Build a status code from its numeric value.
    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// The numeric value.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether this is a 2xx status.
    pub const fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<u16> for StatusCode {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

/// An outgoing request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    target: String,
    headers: Headers,
    body: Body,
}

impl Request {
    /// Create a request with an empty body and no headers.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Headers::new(),
            body: Body::empty(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Shorthand for a POST request.
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    /// A copy of this request with one header appended.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// A copy of this request with the given body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Consume the request, yielding its body.
    pub fn into_body(self) -> Body {
        self.body
    }
}

/// An incoming response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
}

impl Response {
    /// Create a response with an empty body and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
        }
    }

    /// A copy of this response with one header appended.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// A copy of this response with the given body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Consume the response, yielding its body.
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Replace the body through `f`, keeping status and headers.
    ///
    /// Used to layer interruption wrappers onto an already-opened response.
    pub fn map_body(mut self, f: impl FnOnce(Body) -> Body) -> Self {
        self.body = f(self.body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_header_appends() {
        let request = Request::get("/models")
            .with_header("Accept", "application/json")
            .with_header("Accept", "text/plain");
        let values: Vec<_> = request.headers().get_all("accept").collect();
        assert_eq!(values, vec!["application/json", "text/plain"]);
    }

    #[test]
    fn test_status_classification() {
        assert!(StatusCode::OK.is_success());
        assert!(StatusCode::NO_CONTENT.is_success());
        assert!(!StatusCode::NOT_FOUND.is_success());
        assert!(!StatusCode::new(301).is_success());
        assert_eq!(StatusCode::NOT_FOUND, 404u16);
    }

    #[tokio::test]
    async fn test_request_body_round_trip() {
        let request = Request::post("/submit").with_body("payload");
        let bytes = request.into_body().collect().await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }
}
