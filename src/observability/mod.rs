//! Observability subsystem.
//!
//! Structured logging is `tracing`, initialized in `main`; this module owns
//! the metrics surface. Metric updates are cheap atomic operations and never
//! sit on a request's critical path.

pub mod metrics;
