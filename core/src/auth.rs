//! Authentication state carried by an `HttpClient`.
//!
//! # Design
//! A sum type instead of optional username/password/token fields: switching
//! variants structurally cannot retain stale credentials from a previous
//! mode. Exactly one variant is active at any time, and the client embeds a
//! snapshot of it in every request descriptor it builds.

/// The authentication mode applied to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No `Authorization` header is sent.
    #[default]
    None,

    /// HTTP Basic credentials.
    Basic { username: String, password: String },

    /// `Authorization: Bearer <token>`.
    Bearer { token: String },
}

impl AuthState {
    /// Attach this auth state to an outgoing request.
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthState::None => request,
            AuthState::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthState::Bearer { token } => request.bearer_auth(token),
        }
    }
}
