//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a batch run.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default layer-2 exchange REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api3.loopring.io";

/// Exchange contract address signed into every intent.
pub const DEFAULT_EXCHANGE_ADDRESS: &str = "0x0BABA1Ad5bE3a5C0a66E7ac838a129Bf948f1eA4";

/// Counterfactual NFT factory contract.
pub const DEFAULT_NFT_FACTORY: &str = "0xc852aC7aAe4b0f0a0Deb9e8A391ebA2047d80026";

/// Root configuration for a batch run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BatchConfig {
    /// Exchange endpoint and contract addresses.
    pub exchange: ExchangeConfig,

    /// Retry policy applied to exchange reads.
    pub retries: RetryConfig,

    /// Mint flow settings.
    pub mint: MintConfig,

    /// Transfer flow settings.
    pub transfer: TransferConfig,

    /// Settings shared by every item of a batch.
    pub batch: BatchSettings,

    /// Audit file placement.
    pub audit: AuditConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Exchange connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// REST base URL.
    pub base_url: String,

    /// Exchange contract address (first field of every signed intent).
    pub exchange_address: String,

    /// NFT factory used for counterfactual token addresses.
    pub nft_factory: String,

    /// Hard ceiling for a single HTTP request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            exchange_address: DEFAULT_EXCHANGE_ADDRESS.to_string(),
            nft_factory: DEFAULT_NFT_FACTORY.to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per exchange read.
    pub attempts: u32,

    /// Per-attempt deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout_ms: 3000,
        }
    }
}

/// Mint flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MintConfig {
    /// L2 address of the minter (hex).
    pub minter_address: String,

    /// Exchange account id of the minter.
    pub account_id: Option<u64>,

    /// NFT type: 0 = ERC1155, 1 = ERC721.
    pub nft_type: u8,

    /// Royalty percentage in [0, 10].
    pub royalty_percentage: u8,

    /// Token used to pay fees.
    pub fee_token_id: u32,

    /// Base URI of the counterfactual NFT contract.
    pub nft_base_uri: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            minter_address: String::new(),
            account_id: None,
            nft_type: 0,
            royalty_percentage: 0,
            fee_token_id: 1,
            nft_base_uri: String::new(),
        }
    }
}

/// Transfer flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Sender: hex address, ENS name, or decimal account id.
    pub from: String,

    /// Token used to pay fees.
    pub fee_token_id: u32,

    /// Memo attached to every transfer.
    pub memo: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            fee_token_id: 1,
            memo: String::new(),
        }
    }
}

/// Settings shared by every item of a batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Absolute expiry (unix seconds) signed into every intent.
    /// When absent, computed once per run from `validity_days`.
    pub valid_until: Option<u64>,

    /// Validity window used when `valid_until` is absent.
    pub validity_days: u64,

    /// Default amount per item when the CLI does not provide one.
    pub default_amount: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            valid_until: None,
            validity_days: 30,
            default_amount: 1,
        }
    }
}

/// Audit file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory receiving `mint-info.json` / `transfer-info.json`.
    pub directory: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional Prometheus listener kept up for the duration of the run.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.exchange.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retries.attempts, 3);
        assert_eq!(config.retries.timeout_ms, 3000);
        assert_eq!(config.batch.validity_days, 30);
        assert!(config.mint.account_id.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: BatchConfig = toml::from_str(
            r#"
            [mint]
            minter_address = "0xabc"
            account_id = 42
            royalty_percentage = 5

            [retries]
            attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.mint.account_id, Some(42));
        assert_eq!(config.mint.royalty_percentage, 5);
        assert_eq!(config.retries.attempts, 5);
        // Untouched fields keep defaults
        assert_eq!(config.retries.timeout_ms, 3000);
        assert_eq!(config.exchange.nft_factory, DEFAULT_NFT_FACTORY);
    }
}
