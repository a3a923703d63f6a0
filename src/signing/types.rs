//! Operation kinds, hash parameters and signing errors.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling or signing an intent.
#[derive(Debug, Error)]
pub enum SigningError {
    /// An address or amount could not be read as a field element.
    #[error("Malformed field value: {0:?}")]
    MalformedField(String),

    /// Input list does not match the kind's declared arity.
    #[error("{kind:?} expects {expected} inputs, got {actual}")]
    ArityMismatch {
        kind: OperationKind,
        expected: usize,
        actual: usize,
    },

    /// Key material could not be loaded.
    #[error("Key error: {0}")]
    Key(String),
}

/// Result type for signing operations.
pub type SigningResult<T> = Result<T, SigningError>;

/// Signed operation kinds understood by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Content descriptor of an NFT; its hash identifies the NFT.
    NftData,
    /// Mint intent.
    NftMint,
    /// Transfer intent.
    NftTransfer,
}

impl OperationKind {
    /// Fixed number of hash inputs.
    pub fn arity(self) -> usize {
        match self {
            OperationKind::NftData => 6,
            OperationKind::NftMint => 9,
            OperationKind::NftTransfer => 12,
        }
    }

    /// Hash-function configuration for this kind.
    pub fn hash_params(self) -> HashParams {
        let partial_rounds = match self {
            OperationKind::NftData => 52,
            OperationKind::NftMint | OperationKind::NftTransfer => 53,
        };
        HashParams {
            width: self.arity() + 1,
            full_rounds: 6,
            partial_rounds,
            security_target: 128,
        }
    }
}

/// Hash-function configuration keyed by arity and security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashParams {
    pub width: usize,
    pub full_rounds: u32,
    pub partial_rounds: u32,
    pub security_target: u32,
}

/// Detached signature over an intent hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EddsaSignature(pub String);

impl std::fmt::Display for EddsaSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash and signature of one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIntent {
    pub kind: OperationKind,
    pub hash: U256,
    pub signature: EddsaSignature,
}
