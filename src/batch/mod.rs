//! Batch signing & submission orchestration.
//!
//! # Data Flow
//! ```text
//! BatchSource + RangeFilter
//!     → source.rs (ordered entries, skip reasons)
//!     → orchestrator.rs
//!         → ItemFlow::bootstrap (shared context, storage-id lease)
//!         → per item, strictly sequential:
//!             ItemFlow::prepare  (Pending → FeeQuoted)
//!             fee gate           (FeeQuoted → Approved, once per batch)
//!             ItemFlow::complete (Approved → Done*)
//!     → AuditSink (exactly once, on every exit path)
//! ```
//!
//! # Design Decisions
//! - Sequencing, address and fee failures abort the batch; submission
//!   failures only fail the item
//! - The storage-id lease is owned by the orchestrator and passed to flows
//!   by value
//! - Results are explicit types: `BatchError` (fatal) and `ItemOutcome`

use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditError;
use crate::content::ContentError;
use crate::signing::SigningError;

pub mod confirm;
pub mod fees;
pub mod flow;
pub mod item;
pub mod orchestrator;
pub mod source;

pub use confirm::{AutoApprove, Confirmer, ScriptedConfirmer, TerminalConfirmer};
pub use fees::{estimate_batch_fees, token_decimals, FeeApproval, FeeEstimate};
pub use flow::{Bootstrap, Completion, ItemFlow, MintFlow, Preparation, TransferFlow};
pub use item::{BatchItem, ItemOutcome, ItemStatus, ItemTrail, Subject};
pub use orchestrator::{BatchOrchestrator, BatchReport, ItemSummary};
pub use source::{resolve_source, BatchSource, RangeFilter, Recipient, SourceEntry};

/// Batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Mint,
    Transfer,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Mint => "mint",
            Operation::Transfer => "transfer",
        }
    }

    /// Audit file name for this operation.
    pub fn audit_file_name(self) -> &'static str {
        match self {
            Operation::Mint => "mint-info.json",
            Operation::Transfer => "transfer-info.json",
        }
    }
}

/// Conditions that abort the remaining batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to obtain storage id: {0}")]
    Sequencing(String),

    #[error("Failed to obtain token address: {0}")]
    AddressResolution(String),

    #[error("Failed to obtain offchain fee: {0}")]
    FeeQuote(String),

    #[error("Failed to set up the batch: {0}")]
    Bootstrap(String),

    #[error("Aborted by user")]
    Rejected,

    #[error("Interrupted")]
    Interrupted,

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
}
