//! Wire-level plain data: request descriptors and response envelopes.
//!
//! # Design
//! Requests and responses are described as plain owned data. `HttpClient`
//! builds a `RequestDescriptor` synchronously, submits it to the serialized
//! queue, and the dispatcher turns it into an actual network call. Keeping
//! the descriptor inert makes request construction unit-testable without a
//! server.

use std::collections::HashMap;

use serde_json::Value;

use crate::auth::AuthState;

pub use reqwest::Method;

/// A request body: either verbatim text or a structured value that will be
/// serialized as JSON (implying a JSON content-type).
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

/// Everything needed to execute one HTTP call. Immutable once submitted.
///
/// `auth` is a snapshot of the client's auth state at build time, so a later
/// transition on the client cannot retroactively change an in-flight call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub auth: AuthState,
    /// Descriptive metadata: records that the call was built against a
    /// client whose transport carries a cookie jar. The jar itself lives on
    /// the client's transport and is applied there, not by the dispatcher.
    pub jar: bool,
}

/// A completed HTTP response as plain data.
///
/// Header names are lowercased on construction; a name may carry multiple
/// values. Produced once per request and shared by all derived accessors.
#[derive(Debug, Clone, Default)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    /// Case-insensitive lookup of the first value for a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Render a response body for inclusion in a strict-status error message.
///
/// Empty bodies render as the empty string. Bodies containing a null byte
/// are assumed binary and render as `<{content-type}, length={N}>`. Anything
/// else is decoded as UTF-8 text.
pub fn render_body(body: &[u8], content_type: Option<&str>) -> String {
    if body.is_empty() {
        String::new()
    } else if body.contains(&0) {
        format!(
            "<{}, length={}>",
            content_type.unwrap_or("unknown content type"),
            body.len()
        )
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}
