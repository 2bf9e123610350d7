//! Request admission subsystem.
//!
//! # Design Decisions
//! - Fixed-window counters in the shared store: O(1) state per client,
//!   accepting the known boundary-burst imprecision of window edges
//! - Identity resolution is one deployment-wide policy so a client cannot
//!   evade limiting by omitting its credential on some requests
//! - Admission fails open when the store is unreachable: a store outage
//!   degrades protection, never availability

pub mod rate_limit;

pub use rate_limit::{resolve_identity, RateLimiter};
