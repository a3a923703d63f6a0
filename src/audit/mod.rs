//! Resumable audit trail.
//!
//! # Responsibilities
//! - Lay out the batch header and per-item trails (record.rs)
//! - Persist the record exactly once per run (sink.rs)
//!
//! The record never contains secrets: the header carries the resolved
//! config, which holds none, and API keys stay out of every trail.

use thiserror::Error;

pub mod record;
pub mod sink;

pub use record::{AbortInfo, AuditRecord, BatchHeader};
pub use sink::{AuditSink, JsonFileSink, MemorySink};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Audit sink lock poisoned")]
    Poisoned,
}
