//! Exchange wire types and error definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while talking to the exchange.
///
/// HTTP error statuses are not errors at this level: they come back as an
/// [`ExchangeResponse`] with `body: None` and the decoded error body.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Connection, TLS or body transfer failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Base URL or endpoint path could not be joined.
    #[error("Invalid exchange URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Status, optional decoded body and optional structured error of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResponse<T> {
    pub status: u16,
    pub body: Option<T>,
    pub error: Option<Value>,
}

impl<T> ExchangeResponse<T> {
    pub fn ok(status: u16, body: T) -> Self {
        Self {
            status,
            body: Some(body),
            error: None,
        }
    }

    pub fn failed(status: u16, error: Option<Value>) -> Self {
        Self {
            status,
            body: None,
            error,
        }
    }

    /// HTTP 200 with a non-null body.
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.body.is_some()
    }

    /// Body of a successful response.
    pub fn into_success(self) -> Option<T> {
        if self.status == 200 {
            self.body
        } else {
            None
        }
    }
}

/// Offchain request types accepted by the fee endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffchainRequestType {
    NftMint,
    NftTransfer,
}

impl OffchainRequestType {
    pub fn code(self) -> u8 {
        match self {
            OffchainRequestType::NftMint => 9,
            OffchainRequestType::NftTransfer => 11,
        }
    }
}

/// Sequencing state issued per (account, sell token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageId {
    pub order_id: u64,
    pub offchain_id: u64,
}

/// Inputs to counterfactual token-address computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterfactualNftInfo {
    pub nft_owner: String,
    pub nft_factory: String,
    pub nft_base_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterfactualNft {
    pub token_address: String,
}

/// Fee quote for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub token: String,
    /// Integer amount in the token's smallest unit.
    pub fee: String,
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffchainFee {
    pub gas_price: String,
    pub fees: Vec<Fee>,
}

impl OffchainFee {
    /// Quote for `fee_token_id`. The exchange lists fees by token id.
    pub fn fee_for(&self, fee_token_id: u32) -> Option<&Fee> {
        self.fees.get(fee_token_id as usize)
    }
}

/// `POST /api/v3/nft/mint` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub exchange: String,
    pub minter_id: u64,
    pub minter_address: String,
    pub to_account_id: u64,
    pub to_address: String,
    pub nft_type: u8,
    pub token_address: String,
    pub nft_id: String,
    pub amount: String,
    pub valid_until: u64,
    pub royalty_percentage: u8,
    pub storage_id: u64,
    pub max_fee: MaxFee,
    pub force_to_mint: bool,
    pub counter_factual_nft_info: CounterfactualNftInfo,
    pub eddsa_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxFee {
    pub token_id: u32,
    pub amount: String,
}

/// NFT moved by a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferToken {
    pub token_id: u64,
    pub nft_data: String,
    pub amount: String,
}

/// `POST /api/v3/nft/transfer` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub exchange: String,
    pub from_account_id: u64,
    pub from_address: String,
    pub to_account_id: u64,
    pub to_address: String,
    pub token: TransferToken,
    pub max_fee: MaxFee,
    pub storage_id: u64,
    pub valid_until: u64,
    pub eddsa_signature: String,
    pub memo: String,
    pub counter_factual_nft_info: CounterfactualNftInfo,
}

/// Receipt returned by mint and transfer submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User API key. Never logged.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub api_key: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// One NFT held by an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftBalanceEntry {
    pub token_id: u64,
    pub nft_id: String,
    pub nft_data: String,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftBalance {
    pub total_num: u64,
    pub data: Vec<NftBalanceEntry>,
}

impl NftBalance {
    /// Entry whose nft id matches `nft_id`, ignoring case.
    pub fn find(&self, nft_id: &str) -> Option<&NftBalanceEntry> {
        self.data
            .iter()
            .find(|entry| entry.nft_id.eq_ignore_ascii_case(nft_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: u64,
    pub owner: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnsResolution {
    pub data: String,
}
