//! Error types for the test HTTP client.
//!
//! # Design
//! Callers match on variants, so each failure class gets its own: transport
//! failures always propagate, `Status` only fires in strict-status mode, and
//! `Navigation` surfaces at resolution time when a lazy JSON accessor was
//! applied to a shape that cannot support it.
//!
//! `Error` is `Clone` because one response future may be shared by several
//! derived accessors; non-cloneable sources are held behind `Arc`.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced by the client, the endpoint registry and the lazy
/// accessor algebra.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The request never produced a response (connection refused, DNS
    /// failure, malformed URL, broken stream while reading the body).
    #[error("transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// The server answered with a status outside [200, 300) while
    /// strict-status mode was enabled. The message format is part of the
    /// public contract and asserted on by downstream test suites.
    #[error("request returned status code of {status} and body {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed as JSON.
    #[error("response body is not valid JSON: {0}")]
    Json(Arc<serde_json::Error>),

    /// A lazy JSON accessor was applied to a value that does not support
    /// the requested operation.
    #[error("{0}")]
    Navigation(String),

    /// `EndpointRegistry::call` was given a name that was never registered.
    #[error("no endpoint registered under {0:?}")]
    UnknownEndpoint(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
