//! Declarative endpoint templates and the registry that dispatches them.
//!
//! # Design
//! A registry maps logical operation names to `{path template, method,
//! headers}` records bound to one `HttpClient`. Dispatch goes through an
//! explicit `call(name, ...)` on a per-instance table; templates are never
//! injected onto a shared type, so two registries cannot leak operations
//! into each other. Registering a name twice replaces the previous binding.

use std::collections::HashMap;

use serde_json::Value;

use crate::client::HttpClient;
use crate::error::{Error, Result};
use crate::http::{Body, Method};
use crate::promise::ResponsePromise;

/// A declared endpoint: a path with optional `{name}` placeholders, the
/// HTTP method, and headers that override any passed at call time.
#[derive(Debug, Clone)]
pub struct EndpointTemplate {
    pub path: String,
    pub method: Method,
    pub headers: Option<Vec<(String, String)>>,
}

impl EndpointTemplate {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            path: path.to_string(),
            method,
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Call-time parameters: an ordered list of (name, value) pairs. Order
/// matters for query-string fallback, so this is a slice rather than a map.
pub type Params<'a> = &'a [(&'a str, Value)];

/// A typed dispatch table of endpoint templates bound to one client.
#[derive(Debug)]
pub struct EndpointRegistry {
    client: HttpClient,
    endpoints: HashMap<String, EndpointTemplate>,
}

impl EndpointRegistry {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            endpoints: HashMap::new(),
        }
    }

    /// Bind `name` to `template`. Last registration wins.
    pub fn register(&mut self, name: &str, template: EndpointTemplate) -> &mut Self {
        self.endpoints.insert(name.to_string(), template);
        self
    }

    pub fn template(&self, name: &str) -> Option<&EndpointTemplate> {
        self.endpoints.get(name)
    }

    /// The owning client, e.g. for auth transitions between calls.
    pub fn client_mut(&mut self) -> &mut HttpClient {
        &mut self.client
    }

    /// Invoke a registered operation: expand the template with `params`,
    /// then dispatch through the owning client.
    pub fn call(
        &self,
        name: &str,
        params: Params<'_>,
        body: Option<Body>,
        headers: Vec<(String, String)>,
    ) -> Result<ResponsePromise> {
        let template = self
            .endpoints
            .get(name)
            .ok_or_else(|| Error::UnknownEndpoint(name.to_string()))?;
        let path = expand(&template.path, params);
        let headers = template.headers.clone().unwrap_or(headers);
        tracing::debug!(operation = name, %path, "calling registered endpoint");
        Ok(self.client.send(template.method.clone(), &path, body, headers))
    }
}

/// Expand a path template.
///
/// For each parameter: if the template contains a `{name}` placeholder,
/// every occurrence is replaced with the rendered value (arrays are
/// JSON-stringified, scalars rendered bare). Otherwise the parameter is
/// appended to the query string, using `?` if the path has none yet and
/// `&` thereafter.
pub fn expand(template: &str, params: Params<'_>) -> String {
    let mut path = template.to_string();
    for (name, value) in params {
        let placeholder = format!("{{{name}}}");
        let rendered = render_param(value);
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, &rendered);
        } else {
            if !path.contains('?') {
                path.push('?');
            } else if !path.ends_with('?') && !path.ends_with('&') {
                path.push('&');
            }
            path.push_str(name);
            path.push('=');
            path.push_str(&rendered);
        }
    }
    path
}

fn render_param(value: &Value) -> String {
    match value {
        Value::Array(_) => value.to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
