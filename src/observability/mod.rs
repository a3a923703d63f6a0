//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, stderr)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Operator terminal
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Secrets never reach a log line; `Secrets` and key types redact `Debug`
//! - Metrics are cheap (atomic increments) and safe to record without a recorder

pub mod logging;
pub mod metrics;
