//! Lazy handles over pending responses and their JSON bodies.
//!
//! # Design
//! Test code derives many values from one response without resolution
//! bookkeeping. Every accessor composes a transformation onto a deferred
//! computation and returns a new handle; nothing here performs I/O or
//! blocks. Resolution happens only when the final value is awaited.
//!
//! `ResponsePromise` is multi-consumer: it holds a `Shared` future over the
//! response envelope, so `status_code()`, `header()` and `json_body()` can
//! all be derived from the same pending response. `JsonPromise` chains are
//! single-consumer; each step takes `self` and returns a new handle.

use std::cmp::Ordering;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::ResponseEnvelope;

/// A deferred computation of `T`. Composing never forces the underlying
/// future; awaiting (or `resolve`) does.
#[must_use = "a Lazy value does nothing until awaited"]
pub struct Lazy<T> {
    inner: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> Lazy<T> {
    pub(crate) fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self { inner: fut.boxed() }
    }

    /// Compose an infallible transformation.
    pub fn map<U, F>(self, f: F) -> Lazy<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Lazy::new(async move { self.inner.await.map(f) })
    }

    /// Compose a transformation that may fail at resolution time.
    pub fn and_then<U, F>(self, f: F) -> Lazy<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        Lazy::new(async move { f(self.inner.await?) })
    }

    /// Force the computation.
    pub async fn resolve(self) -> Result<T> {
        self.inner.await
    }
}

impl<T> IntoFuture for Lazy<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner
    }
}

type SharedEnvelope = Shared<BoxFuture<'static, Result<Arc<ResponseEnvelope>>>>;

/// A handle over a pending HTTP response.
///
/// Cloning (or calling several accessors) shares the same underlying
/// response; the request is executed once.
#[derive(Clone)]
#[must_use = "derive an accessor and await it to observe the response"]
pub struct ResponsePromise {
    inner: SharedEnvelope,
}

impl ResponsePromise {
    pub(crate) fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<ResponseEnvelope>> + Send + 'static,
    {
        Self {
            inner: async move { fut.await.map(Arc::new) }.boxed().shared(),
        }
    }

    /// A promise over an already-completed envelope. Useful as a fixture
    /// when testing code that consumes promises.
    pub fn ready(envelope: ResponseEnvelope) -> Self {
        Self::new(std::future::ready(Ok(envelope)))
    }

    /// The full envelope, once the request settles.
    pub fn envelope(&self) -> Lazy<Arc<ResponseEnvelope>> {
        let shared = self.inner.clone();
        Lazy::new(shared)
    }

    pub fn status_code(&self) -> Lazy<u16> {
        self.envelope().map(|envelope| envelope.status)
    }

    /// Case-insensitive lookup of the first value for a response header.
    pub fn header(&self, name: &str) -> Lazy<Option<String>> {
        let name = name.to_ascii_lowercase();
        self.envelope()
            .map(move |envelope| envelope.header(&name).map(str::to_string))
    }

    /// The raw body bytes.
    pub fn body(&self) -> Lazy<Vec<u8>> {
        self.envelope().map(|envelope| envelope.body.clone())
    }

    /// The body decoded as UTF-8 text.
    pub fn string_body(&self) -> Lazy<String> {
        self.envelope()
            .map(|envelope| String::from_utf8_lossy(&envelope.body).into_owned())
    }

    /// The body parsed as JSON. Parsing happens at resolution time.
    pub fn json_body(&self) -> JsonPromise {
        JsonPromise {
            inner: self
                .envelope()
                .and_then(|envelope| serde_json::from_slice(&envelope.body).map_err(Error::from)),
        }
    }
}

/// A handle over pending parsed JSON supporting deferred navigation.
#[must_use = "a JsonPromise does nothing until resolved"]
pub struct JsonPromise {
    inner: Lazy<Value>,
}

impl JsonPromise {
    /// A promise over an already-known value. Useful as a fixture.
    pub fn from_value(value: Value) -> Self {
        Self {
            inner: Lazy::new(std::future::ready(Ok(value))),
        }
    }

    /// Field access on objects, or index access on arrays when `key`
    /// parses as a number.
    pub fn get(self, key: &str) -> JsonPromise {
        let key = key.to_string();
        Self {
            inner: self.inner.and_then(move |value| navigate(&value, &key)),
        }
    }

    /// Index access on arrays.
    pub fn at(self, index: usize) -> JsonPromise {
        self.get(&index.to_string())
    }

    /// Navigate a dot-delimited path, e.g. `deep_get("a.b.c")`. A missing
    /// intermediate key fails with `Error::Navigation` at resolution time.
    pub fn deep_get(self, path: &str) -> JsonPromise {
        let path = path.to_string();
        Self {
            inner: self.inner.and_then(move |value| {
                let mut current = value;
                for segment in path.split('.') {
                    current = navigate(&current, segment).map_err(|err| {
                        Error::Navigation(format!("{err} (while walking {path:?})"))
                    })?;
                }
                Ok(current)
            }),
        }
    }

    /// Map an array of objects to the array of one field's values.
    pub fn pluck_from_array_of_object(self, key: &str) -> JsonPromise {
        let key = key.to_string();
        Self {
            inner: self.inner.and_then(move |value| {
                let items = as_array(&value, "pluck")?;
                let plucked = items
                    .iter()
                    .map(|item| navigate(item, &key))
                    .collect::<Result<Vec<Value>>>()?;
                Ok(Value::Array(plucked))
            }),
        }
    }

    /// Sort an array with the default ordering: numbers numerically,
    /// strings lexicographically, mixed values by their JSON rendering.
    pub fn sorted(self) -> JsonPromise {
        Self {
            inner: self.inner.and_then(|value| {
                let mut items = as_array(&value, "sort")?.to_vec();
                items.sort_by(compare);
                Ok(Value::Array(items))
            }),
        }
    }

    /// The length of an array.
    pub fn array_count(self) -> Lazy<usize> {
        self.inner
            .and_then(|value| Ok(as_array(&value, "count")?.len()))
    }

    /// Keep only the array elements matching `predicate`.
    pub fn filter_array<F>(self, predicate: F) -> JsonPromise
    where
        F: Fn(&Value) -> bool + Send + 'static,
    {
        Self {
            inner: self.inner.and_then(move |value| {
                let items = as_array(&value, "filter")?;
                Ok(Value::Array(
                    items.iter().filter(|item| predicate(item)).cloned().collect(),
                ))
            }),
        }
    }

    /// Force the chain and yield the final value.
    pub async fn resolve(self) -> Result<Value> {
        self.inner.resolve().await
    }
}

impl IntoFuture for JsonPromise {
    type Output = Result<Value>;
    type IntoFuture = BoxFuture<'static, Result<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner.into_future()
    }
}

/// One navigation step: object field lookup, or array indexing when the
/// segment is numeric.
fn navigate(value: &Value, segment: &str) -> Result<Value> {
    match value {
        Value::Object(map) => map
            .get(segment)
            .cloned()
            .ok_or_else(|| Error::Navigation(format!("no field {segment:?} in object"))),
        Value::Array(items) => {
            let index: usize = segment.parse().map_err(|_| {
                Error::Navigation(format!("array index {segment:?} is not a number"))
            })?;
            items.get(index).cloned().ok_or_else(|| {
                Error::Navigation(format!(
                    "index {index} out of bounds for array of length {}",
                    items.len()
                ))
            })
        }
        other => Err(Error::Navigation(format!(
            "cannot navigate with {segment:?} into {}",
            kind(other)
        ))),
    }
}

fn as_array<'a>(value: &'a Value, operation: &str) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        Error::Navigation(format!("cannot {operation} a {}", kind(value)))
    })
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(f64::NAN)
            .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn json_envelope(value: &Value) -> ResponseEnvelope {
        ResponseEnvelope {
            status: 200,
            headers: HashMap::from([(
                "content-type".to_string(),
                vec!["application/json".to_string()],
            )]),
            body: value.to_string().into_bytes(),
        }
    }

    #[tokio::test]
    async fn accessors_share_one_envelope() {
        let promise = ResponsePromise::ready(json_envelope(&json!({"ok": true})));

        assert_eq!(promise.status_code().await.unwrap(), 200);
        assert_eq!(
            promise.header("Content-Type").await.unwrap().as_deref(),
            Some("application/json")
        );
        assert_eq!(
            promise.json_body().get("ok").resolve().await.unwrap(),
            json!(true)
        );
    }

    #[tokio::test]
    async fn json_body_round_trips_byte_bodies() {
        let value = json!({"a": [1, 2, 3], "b": {"c": "deep"}});
        let promise = ResponsePromise::ready(json_envelope(&value));
        assert_eq!(promise.json_body().resolve().await.unwrap(), value);
    }

    #[tokio::test]
    async fn string_body_decodes_utf8() {
        let promise = ResponsePromise::ready(ResponseEnvelope {
            status: 200,
            headers: HashMap::new(),
            body: b"hello".to_vec(),
        });
        assert_eq!(promise.string_body().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn json_body_on_non_json_fails_at_resolution() {
        let promise = ResponsePromise::ready(ResponseEnvelope {
            status: 200,
            headers: HashMap::new(),
            body: b"not json".to_vec(),
        });
        // Building the chain succeeds; only resolving reports the error.
        let chain = promise.json_body().get("anything");
        assert!(matches!(chain.resolve().await, Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn deep_get_walks_nested_objects() {
        let chain = JsonPromise::from_value(json!({"a": {"b": {"c": 42}}}));
        assert_eq!(chain.deep_get("a.b.c").resolve().await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn deep_get_missing_intermediate_is_navigation_error() {
        let chain = JsonPromise::from_value(json!({"a": {"b": {}}}));
        let err = chain.deep_get("a.b.c").resolve().await.unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
        assert!(err.to_string().contains("a.b.c"));
    }

    #[tokio::test]
    async fn deep_get_indexes_arrays_with_numeric_segments() {
        let chain = JsonPromise::from_value(json!([{"name": "x"}, {"name": "y"}]));
        assert_eq!(
            chain.deep_get("1.name").resolve().await.unwrap(),
            json!("y")
        );
    }

    #[tokio::test]
    async fn get_with_numeric_string_indexes_arrays() {
        let chain = JsonPromise::from_value(json!(["zero", "one"]));
        assert_eq!(chain.get("0").resolve().await.unwrap(), json!("zero"));
    }

    #[tokio::test]
    async fn at_indexes_arrays() {
        let chain = JsonPromise::from_value(json!(["zero", "one"]));
        assert_eq!(chain.at(1).resolve().await.unwrap(), json!("one"));
    }

    #[tokio::test]
    async fn get_on_scalar_is_navigation_error() {
        let chain = JsonPromise::from_value(json!(17));
        let err = chain.get("field").resolve().await.unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
    }

    #[tokio::test]
    async fn pluck_extracts_one_field_per_object() {
        let chain = JsonPromise::from_value(json!([{"name": "x"}, {"name": "y"}]));
        assert_eq!(
            chain
                .pluck_from_array_of_object("name")
                .resolve()
                .await
                .unwrap(),
            json!(["x", "y"])
        );
    }

    #[tokio::test]
    async fn pluck_composes_with_sorted() {
        let chain = JsonPromise::from_value(json!([
            {"locationId": 2},
            {"locationId": 1},
            {"locationId": 3},
            {"locationId": 1}
        ]));
        assert_eq!(
            chain
                .pluck_from_array_of_object("locationId")
                .sorted()
                .resolve()
                .await
                .unwrap(),
            json!([1, 1, 2, 3])
        );
    }

    #[tokio::test]
    async fn sorted_orders_strings_lexicographically() {
        let chain = JsonPromise::from_value(json!(["pear", "apple", "mango"]));
        assert_eq!(
            chain.sorted().resolve().await.unwrap(),
            json!(["apple", "mango", "pear"])
        );
    }

    #[tokio::test]
    async fn array_count_yields_length() {
        let chain = JsonPromise::from_value(json!([1, 2, 3, 4]));
        assert_eq!(chain.array_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn array_count_on_object_is_navigation_error() {
        let chain = JsonPromise::from_value(json!({"a": 1}));
        assert!(matches!(
            chain.array_count().await,
            Err(Error::Navigation(_))
        ));
    }

    #[tokio::test]
    async fn filter_array_keeps_matching_elements() {
        let chain = JsonPromise::from_value(json!([
            {"locationId": 1},
            {"locationId": 3},
            {"locationId": 2}
        ]));
        assert_eq!(
            chain
                .filter_array(|item| item["locationId"] == json!(3))
                .resolve()
                .await
                .unwrap(),
            json!([{"locationId": 3}])
        );
    }

    #[tokio::test]
    async fn filter_on_non_array_is_navigation_error() {
        let chain = JsonPromise::from_value(json!("scalar"));
        assert!(matches!(
            chain.filter_array(|_| true).resolve().await,
            Err(Error::Navigation(_))
        ));
    }
}
