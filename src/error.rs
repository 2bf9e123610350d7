//! Request-scoped error taxonomy.
//!
//! Every failure a single request can hit is converted to an HTTP status at
//! the handler boundary. Nothing in this enum terminates the serving process;
//! only startup failures (config parsing, initial store connect) are fatal.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced while handling a single gateway request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, malformed, expired, or otherwise invalid credential.
    #[error("{0}")]
    Authentication(String),

    /// Valid credential, but the subject is not allowed to see this resource.
    #[error("admin access required")]
    Forbidden,

    /// Client exhausted its fixed-window quota.
    #[error("too many requests, retry in {retry_after_secs} seconds")]
    AdmissionRejected { retry_after_secs: u64 },

    /// The configured upstream list is empty.
    #[error("no upstream backend available")]
    NoBackendAvailable,

    /// Network failure or timeout while forwarding to the chosen upstream.
    #[error("upstream error: {0}")]
    UpstreamTransport(String),

    /// The shared state store is unreachable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, msg).into_response()
            }
            GatewayError::Forbidden => {
                (StatusCode::FORBIDDEN, "admin access required").into_response()
            }
            GatewayError::AdmissionRejected { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("Too many requests. Try again in {} seconds.", retry_after_secs),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            GatewayError::NoBackendAvailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "no upstream backend available").into_response()
            }
            GatewayError::UpstreamTransport(msg) => {
                (StatusCode::BAD_GATEWAY, format!("Upstream error: {}", msg)).into_response()
            }
            GatewayError::Store(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "state store unavailable").into_response()
            }
        }
    }
}
