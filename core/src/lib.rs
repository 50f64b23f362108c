//! Async HTTP client for integration tests with a synchronous-looking
//! assertion surface.
//!
//! # Overview
//! Three mechanisms cooperate to make asynchronous HTTP calls safe to
//! assert on in sequence:
//! - a process-wide [`queue::ControlFlow`] that serializes submitted calls,
//!   so responses settle in program order;
//! - lazy accessor chains ([`ResponsePromise`] / [`JsonPromise`]) that
//!   derive many values from one pending response without forcing it;
//! - an [`EndpointRegistry`] that expands declarative path templates into
//!   concrete requests dispatched through one client.
//!
//! # Design
//! - `HttpClient` owns its auth state (a sum type, so credential modes are
//!   exclusive) and a cookie jar shared across its own sequential calls.
//! - Request building is split from dispatch (`build_request` vs `send`),
//!   keeping descriptor construction free of I/O.
//! - Non-2xx responses are ordinary results unless strict-status mode is
//!   enabled, in which case they reject with a formatted `Error::Status`.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod promise;
pub mod queue;

pub use auth::AuthState;
pub use client::HttpClient;
pub use endpoints::{expand, EndpointRegistry, EndpointTemplate, Params};
pub use error::{Error, Result};
pub use http::{render_body, Body, Method, RequestDescriptor, ResponseEnvelope};
pub use promise::{JsonPromise, Lazy, ResponsePromise};
pub use queue::{control_flow, ControlFlow};
