//! Layer-2 exchange integration.
//!
//! # Data Flow
//! ```text
//! ItemFlow
//!     → RetryPolicy (per-attempt deadline, bounded retries)
//!     → ExchangeClient (trait; client.rs ships the reqwest implementation)
//!     → ExchangeResponse { status, body, error }
//! ```

pub mod client;
pub mod types;

pub use client::{ExchangeClient, RestExchangeClient};
pub use types::{
    AccountInfo, ApiKey, CounterfactualNft, CounterfactualNftInfo, EnsResolution, ExchangeError,
    ExchangeResponse, ExchangeResult, Fee, MaxFee, MintRequest, NftBalance, NftBalanceEntry,
    OffchainFee, OffchainRequestType, StorageId, SubmissionReceipt, TransferRequest, TransferToken,
};
