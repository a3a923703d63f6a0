//! Canonical intent construction and signing.
//!
//! # Responsibilities
//! - Assemble the ordered hash inputs for each operation kind
//! - Validate input arity before hashing
//! - Hash with the kind's parameter set and sign the result
//! - Sign exchange API requests (`X-API-SIG`)
//!
//! Field order is part of the protocol contract with the exchange. The
//! builders below are the only place where order is decided.

use std::sync::Arc;

use alloy::primitives::U256;
use url::form_urlencoded;

use crate::content::NftId;
use crate::signing::hasher::FieldHasher;
use crate::signing::signer::IntentSigner;
use crate::signing::types::{EddsaSignature, OperationKind, SignedIntent, SigningError, SigningResult};

/// Content descriptor of an NFT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftDataInputs {
    pub minter_address: U256,
    pub nft_type: u8,
    pub token_address: U256,
    pub nft_id: NftId,
    pub royalty_percentage: u8,
}

impl NftDataInputs {
    pub fn to_fields(&self) -> Vec<U256> {
        vec![
            self.minter_address,
            U256::from(self.nft_type),
            self.token_address,
            self.nft_id.low(),
            self.nft_id.high(),
            U256::from(self.royalty_percentage),
        ]
    }
}

/// Mint intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftMintInputs {
    pub exchange: U256,
    pub minter_account_id: u64,
    pub to_account_id: u64,
    pub nft_data_hash: U256,
    pub amount: u64,
    pub fee_token_id: u32,
    pub fee_amount: U256,
    pub valid_until: u64,
    pub storage_id: u64,
}

impl NftMintInputs {
    pub fn to_fields(&self) -> Vec<U256> {
        vec![
            self.exchange,
            U256::from(self.minter_account_id),
            U256::from(self.to_account_id),
            self.nft_data_hash,
            U256::from(self.amount),
            U256::from(self.fee_token_id),
            self.fee_amount,
            U256::from(self.valid_until),
            U256::from(self.storage_id),
        ]
    }
}

/// Transfer intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftTransferInputs {
    pub exchange: U256,
    pub from_account_id: u64,
    pub to_account_id: u64,
    pub token_id: u64,
    pub amount: u64,
    pub fee_token_id: u32,
    pub fee_amount: U256,
    pub to_address: U256,
    pub valid_until: u64,
    pub storage_id: u64,
}

impl NftTransferInputs {
    pub fn to_fields(&self) -> Vec<U256> {
        vec![
            self.exchange,
            U256::from(self.from_account_id),
            U256::from(self.to_account_id),
            U256::from(self.token_id),
            U256::from(self.amount),
            U256::from(self.fee_token_id),
            self.fee_amount,
            self.to_address,
            // Reserved
            U256::ZERO,
            U256::ZERO,
            U256::from(self.valid_until),
            U256::from(self.storage_id),
        ]
    }
}

/// Hashes and signs intents with one key.
#[derive(Clone)]
pub struct SignatureEngine {
    hasher: Arc<dyn FieldHasher>,
    signer: Arc<dyn IntentSigner>,
}

impl SignatureEngine {
    pub fn new(hasher: Arc<dyn FieldHasher>, signer: Arc<dyn IntentSigner>) -> Self {
        Self { hasher, signer }
    }

    /// Hash `inputs` with the parameter set of `kind`.
    pub fn hash(&self, kind: OperationKind, inputs: &[U256]) -> SigningResult<U256> {
        if inputs.len() != kind.arity() {
            return Err(SigningError::ArityMismatch {
                kind,
                expected: kind.arity(),
                actual: inputs.len(),
            });
        }
        Ok(self.hasher.hash(&kind.hash_params(), inputs))
    }

    /// Hash `inputs` and sign the hash.
    pub fn build_and_sign(&self, kind: OperationKind, inputs: &[U256]) -> SigningResult<SignedIntent> {
        let hash = self.hash(kind, inputs)?;
        let signature = self.signer.sign(&hash)?;
        tracing::debug!(kind = ?kind, "Intent signed");
        Ok(SignedIntent { kind, hash, signature })
    }

    /// Sign an exchange API request.
    ///
    /// The signed message is `METHOD&enc(url)&enc(k1=v1&k2=v2)` with params
    /// sorted by key.
    pub fn sign_api_request(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> SigningResult<EddsaSignature> {
        let message = canonical_request(method, url, params);
        let hash = self.hasher.hash_message(message.as_bytes());
        self.signer.sign(&hash)
    }

    pub fn public_key(&self) -> String {
        self.signer.public_key()
    }
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("public_key", &self.signer.public_key())
            .finish()
    }
}

fn canonical_request(method: &str, url: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        form_urlencoded::byte_serialize(url.as_bytes()).collect::<String>(),
        form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>()
    )
}
