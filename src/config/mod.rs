//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: MINTER, ACCT_ID, FEE_TOKEN_ID, ...)
//!     → validation.rs (semantic checks for the requested operation)
//!     → BatchConfig (validated, immutable)
//!     → passed by reference to every component
//!
//! environment (LOOPRING_API_KEY, LOOPRING_PRIVATE_KEY)
//!     → secrets.rs
//!     → Secrets (never logged, never written to the audit file)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; one value per run
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod secrets;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BatchConfig;
pub use schema::{ExchangeConfig, MintConfig, RetryConfig, TransferConfig};
pub use secrets::Secrets;
pub use validation::{validate_config, ValidationError};

use std::time::{SystemTime, UNIX_EPOCH};

impl BatchConfig {
    /// Expiry signed into every intent of this run.
    pub fn resolve_valid_until(&self) -> u64 {
        match self.batch.valid_until {
            Some(v) => v,
            None => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                now.saturating_add(self.batch.validity_days.saturating_mul(24 * 3600))
            }
        }
    }
}
