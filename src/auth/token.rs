//! Signed bearer token handling.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, DecodingKey, EncodingKey,
    Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Claims carried by a gateway credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity the token was issued to.
    pub sub: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
}

/// Issue a token for `subject` expiring after `expiry_mins`.
pub fn issue(secret: &str, subject: &str, expiry_mins: u64) -> Result<String, GatewayError> {
    let claims = Claims {
        sub: subject.to_string(),
        exp: get_current_timestamp() + expiry_mins * 60,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| GatewayError::Authentication(format!("failed to sign token: {}", e)))
}

/// Verify signature and expiry, returning the claims.
pub fn verify(secret: &str, token: &str) -> Result<Claims, GatewayError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => {
            GatewayError::Authentication("Token has expired".to_string())
        }
        _ => GatewayError::Authentication("Invalid token".to_string()),
    })
}

/// Extract the bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GatewayError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            GatewayError::Authentication("Missing or invalid Authorization header".to_string())
        })
}
