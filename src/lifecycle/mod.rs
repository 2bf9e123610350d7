//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     env config → validate → connect store → spawn monitor → serve
//!
//! Shutdown:
//!     ctrl-c or trigger → broadcast → server drains, monitor finishes
//!     its in-flight cycle and exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
