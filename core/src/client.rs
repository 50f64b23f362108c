//! The HTTP client: descriptor building, serialized dispatch and outcome
//! classification.
//!
//! # Design
//! `send` is split in two the way the request path wants to be tested:
//! `build_request` produces a plain `RequestDescriptor` synchronously (unit
//! testable, no I/O), and `dispatch` executes it over the network. Dispatch
//! is submitted through the process-wide `ControlFlow` queue, so calls made
//! by sequential test statements settle in program order even though the
//! transport is asynchronous.
//!
//! Each client owns a cookie jar, so a login call followed by a call to a
//! protected endpoint on the same client shares session state.

use std::collections::HashMap;

use crate::auth::AuthState;
use crate::error::{Error, Result};
use crate::http::{render_body, Body, Method, RequestDescriptor, ResponseEnvelope};
use crate::promise::ResponsePromise;
use crate::queue;

/// An HTTP client for integration tests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    inner: reqwest::Client,
    auth: AuthState,
    fail_on_http_error: bool,
}

impl HttpClient {
    /// Create a client rooted at `base_url`, with its own cookie jar and no
    /// authentication.
    pub fn new(base_url: &str) -> Result<Self> {
        let inner = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            inner,
            auth: AuthState::None,
            fail_on_http_error: false,
        })
    }

    /// When enabled, any response with a status outside [200, 300) rejects
    /// with `Error::Status` instead of resolving.
    pub fn fail_on_http_error(&mut self, value: bool) -> &mut Self {
        self.fail_on_http_error = value;
        self
    }

    /// Switch to HTTP Basic credentials, replacing any prior auth state.
    pub fn with_basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.auth = AuthState::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        self
    }

    /// Switch to a bearer token, replacing any prior auth state.
    pub fn with_bearer_token(&mut self, token: &str) -> &mut Self {
        self.auth = AuthState::Bearer {
            token: token.to_string(),
        };
        self
    }

    /// Drop all authentication; subsequent requests carry no auth header.
    pub fn with_no_auth(&mut self) -> &mut Self {
        self.auth = AuthState::None;
        self
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn get(&self, path: &str) -> ResponsePromise {
        self.send(Method::GET, path, None, Vec::new())
    }

    pub fn post(&self, path: &str, body: impl Into<Body>) -> ResponsePromise {
        self.send(Method::POST, path, Some(body.into()), Vec::new())
    }

    pub fn put(&self, path: &str, body: impl Into<Body>) -> ResponsePromise {
        self.send(Method::PUT, path, Some(body.into()), Vec::new())
    }

    pub fn patch(&self, path: &str, body: impl Into<Body>) -> ResponsePromise {
        self.send(Method::PATCH, path, Some(body.into()), Vec::new())
    }

    pub fn delete(&self, path: &str) -> ResponsePromise {
        self.send(Method::DELETE, path, None, Vec::new())
    }

    pub fn get_with_headers(&self, path: &str, headers: Vec<(String, String)>) -> ResponsePromise {
        self.send(Method::GET, path, None, headers)
    }

    pub fn post_with_headers(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Vec<(String, String)>,
    ) -> ResponsePromise {
        self.send(Method::POST, path, Some(body.into()), headers)
    }

    pub fn put_with_headers(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Vec<(String, String)>,
    ) -> ResponsePromise {
        self.send(Method::PUT, path, Some(body.into()), headers)
    }

    pub fn patch_with_headers(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Vec<(String, String)>,
    ) -> ResponsePromise {
        self.send(Method::PATCH, path, Some(body.into()), headers)
    }

    pub fn delete_with_headers(&self, path: &str, headers: Vec<(String, String)>) -> ResponsePromise {
        self.send(Method::DELETE, path, None, headers)
    }

    /// Build a descriptor for `method` on `path` without executing it.
    ///
    /// `path` may be absolute; otherwise it is joined onto the client's
    /// base URL. The current auth state is embedded as a snapshot.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        headers: Vec<(String, String)>,
    ) -> RequestDescriptor {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        RequestDescriptor {
            method,
            url,
            headers,
            body,
            auth: self.auth.clone(),
            jar: true,
        }
    }

    /// Build the descriptor and submit it to the serialized queue.
    ///
    /// The queue slot is reserved immediately, so two `send` calls made in
    /// sequence settle in that order no matter how fast each response
    /// arrives. The request itself runs when the promise is first resolved.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        headers: Vec<(String, String)>,
    ) -> ResponsePromise {
        let descriptor = self.build_request(method, path, body, headers);
        let transport = self.inner.clone();
        let strict = self.fail_on_http_error;
        ResponsePromise::new(
            queue::control_flow().execute(async move { dispatch(transport, descriptor, strict).await }),
        )
    }
}

/// Execute a descriptor and classify the outcome.
async fn dispatch(
    transport: reqwest::Client,
    descriptor: RequestDescriptor,
    strict: bool,
) -> Result<ResponseEnvelope> {
    tracing::debug!(method = %descriptor.method, url = %descriptor.url, "dispatching request");

    let mut request = transport.request(descriptor.method.clone(), descriptor.url.as_str());
    for (name, value) in &descriptor.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request = match &descriptor.body {
        Some(Body::Text(text)) => request.body(text.clone()),
        Some(Body::Json(value)) => request.json(value),
        None => request,
    };
    request = descriptor.auth.apply(request);

    let response = request.send().await?;

    let status = response.status().as_u16();
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in response.headers() {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    let body = response.bytes().await?.to_vec();
    let envelope = ResponseEnvelope {
        status,
        headers,
        body,
    };

    if strict && !(200..300).contains(&status) {
        let rendered = render_body(&envelope.body, envelope.content_type());
        tracing::debug!(status, "strict-status mode rejecting response");
        return Err(Error::Status {
            status,
            body: rendered,
        });
    }

    tracing::trace!(status, "request settled");
    Ok(envelope)
}
