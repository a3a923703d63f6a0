//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (royalty, nft type, retry bounds, validity)
//! - Keep the HTTP timeout at or above the per-attempt retry timeout
//! - Check that every address signed into an intent parses as a field element
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before any network activity

use thiserror::Error;
use url::Url;

use crate::batch::Operation;
use crate::config::schema::BatchConfig;
use crate::signing::fields::parse_field;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid address for {field}: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("invalid exchange URL {0:?}")]
    InvalidUrl(String),

    #[error("exchange.request_timeout_secs ({request_secs}s) is shorter than retries.timeout_ms ({attempt_ms}ms)")]
    RequestTimeoutBelowAttempt { request_secs: u64, attempt_ms: u64 },
}

/// Upper bound for `batch.validity_days`.
pub const MAX_VALIDITY_DAYS: u64 = 3650;

/// Validate the settings needed by `operation`.
pub fn validate_config(config: &BatchConfig, operation: Operation) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Url::parse(&config.exchange.base_url).is_err() {
        errors.push(ValidationError::InvalidUrl(config.exchange.base_url.clone()));
    }
    check_address(&mut errors, "exchange.exchange_address", &config.exchange.exchange_address);
    check_address(&mut errors, "exchange.nft_factory", &config.exchange.nft_factory);

    if config.retries.attempts == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "retries.attempts",
            value: 0,
            min: 1,
            max: u32::MAX as u64,
        });
    }
    if config.retries.timeout_ms == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "retries.timeout_ms",
            value: 0,
            min: 1,
            max: u64::MAX,
        });
    }
    // A request cut short by the HTTP client surfaces as a transport error,
    // which the retry policy does not retry.
    if config.exchange.request_timeout_secs.saturating_mul(1000) < config.retries.timeout_ms {
        errors.push(ValidationError::RequestTimeoutBelowAttempt {
            request_secs: config.exchange.request_timeout_secs,
            attempt_ms: config.retries.timeout_ms,
        });
    }

    if config.batch.valid_until.is_none() && config.batch.validity_days > MAX_VALIDITY_DAYS {
        errors.push(ValidationError::OutOfRange {
            field: "batch.validity_days",
            value: config.batch.validity_days,
            min: 0,
            max: MAX_VALIDITY_DAYS,
        });
    }

    match operation {
        Operation::Mint => validate_mint(config, &mut errors),
        Operation::Transfer => validate_transfer(config, &mut errors),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_mint(config: &BatchConfig, errors: &mut Vec<ValidationError>) {
    let mint = &config.mint;

    if mint.minter_address.is_empty() {
        errors.push(ValidationError::Missing("minter address (MINTER)"));
    } else {
        check_address(errors, "mint.minter_address", &mint.minter_address);
    }

    if mint.account_id.is_none() {
        errors.push(ValidationError::Missing("account id (ACCT_ID)"));
    }

    if mint.nft_type > 1 {
        errors.push(ValidationError::OutOfRange {
            field: "mint.nft_type (NFT_TYPE)",
            value: mint.nft_type as u64,
            min: 0,
            max: 1,
        });
    }

    if mint.royalty_percentage > 10 {
        errors.push(ValidationError::OutOfRange {
            field: "mint.royalty_percentage (ROYALTY_PERCENTAGE)",
            value: mint.royalty_percentage as u64,
            min: 0,
            max: 10,
        });
    }
}

fn validate_transfer(config: &BatchConfig, errors: &mut Vec<ValidationError>) {
    if config.transfer.from.trim().is_empty() {
        errors.push(ValidationError::Missing("sender (FROM)"));
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if parse_field(value).is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
