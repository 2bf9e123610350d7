//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → server.rs (axum router, request-id, trace, timeout layers)
//!     → POST /login          → credential issuance
//!     → GET  /admin/status   → status reporter (privileged subject)
//!     → anything else        → proxy.rs dispatcher
//!         credential → admission → selection → accounting → forward → relay
//! ```

pub mod proxy;
pub mod request;
pub mod server;

pub use request::{GatewayRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
