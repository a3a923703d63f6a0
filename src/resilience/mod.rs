//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Exchange call:
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On timeout: retries.rs (immediate retry, bounded attempts)
//!     → On exhaustion: "no result" to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every exchange call has a deadline
//! - Reads are retried; submissions get one attempt

pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::{bounded, Attempt};
