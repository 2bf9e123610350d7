//! Health probing subsystem.
//!
//! # Data Flow
//! ```text
//! monitor.rs:
//!     Periodic ticker (interval_secs)
//!     → probe every upstream concurrently, bounded per-probe timeout
//!     → success: up_health=1, up_fail=0, up_lat=<ms>   (unless pinned)
//!     → failure: INCR up_fail, up_health=0
//!     → up_fail reaches threshold: up_pin set with pin_secs expiry
//!
//! dispatcher (fast path):
//!     forward failure → INCR up_fail, independent of the probe cycle
//! ```
//!
//! # Design Decisions
//! - The monitor writes, the selector reads; no channel between them,
//!   eventual consistency tolerated through the shared store
//! - The circuit pin overrides intermediate probe successes for its whole
//!   window, preventing verdict flapping
//! - Cancellation is cooperative: the stop signal is observed at the cycle
//!   boundary, the in-flight cycle finishes

pub mod monitor;

pub use monitor::HealthMonitor;
