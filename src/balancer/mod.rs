//! Upstream selection and connection accounting.
//!
//! # Data Flow
//! ```text
//! selector.rs:
//!     read up_health / up_conn for every configured upstream
//!     → filter to explicitly-healthy
//!     → minimum active connections, first-listed wins ties
//!
//! lease.rs:
//!     dispatcher acquires → INCR up_conn
//!     lease dropped (any exit path) → DECR up_conn, floored at 0
//!
//! status.rs:
//!     read-only aggregation of all per-upstream records for /admin/status
//! ```
//!
//! # Design Decisions
//! - Selection is stateless and side-effect free; accounting belongs to the
//!   caller, which keeps selection idempotent and retry-safe
//! - No shared cyclic cursor: concurrent selections need no coordination
//!   beyond the store's atomic counters
//! - When no upstream is healthy the first configured one is used anyway,
//!   surfaced as a degraded-mode event (availability over accuracy)

pub mod lease;
pub mod selector;
pub mod status;

pub use lease::ConnectionLease;
pub use selector::{select_upstream, Selection};
pub use status::{upstream_status, UpstreamStatus};
