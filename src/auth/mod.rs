//! Credential issuance and verification.
//!
//! Tokens are opaque to the rest of the gateway: stateless HS256 JWTs
//! carrying a subject and an expiry, verified before any routing work.

pub mod token;

pub use token::{bearer_token, issue, verify, Claims};
