//! Secrets resolved from the process environment.
//!
//! Kept apart from [`BatchConfig`](crate::config::BatchConfig) so the config can
//! be dumped to logs and the audit file without leaking keys.

use alloy::primitives::U256;

use crate::config::loader::ConfigError;

/// Environment variable holding the exchange API key.
pub const API_KEY_ENV_VAR: &str = "LOOPRING_API_KEY";

/// Environment variable holding the layer-2 signing key.
pub const PRIVATE_KEY_ENV_VAR: &str = "LOOPRING_PRIVATE_KEY";

/// Credentials for one run.
#[derive(Clone)]
pub struct Secrets {
    api_key: Option<String>,
    private_key: String,
}

impl Secrets {
    /// Build secrets from raw values, normalizing the private key.
    ///
    /// A key without `0x` prefix is read as a decimal integer and rendered as
    /// 0x-prefixed, zero-padded 64-digit hex.
    pub fn new(api_key: Option<String>, private_key: &str) -> Result<Self, ConfigError> {
        let private_key = normalize_private_key(private_key)?;
        Ok(Self { api_key, private_key })
    }

    /// Read secrets from the environment.
    ///
    /// The API key is mandatory for minting; transfers obtain one from the
    /// exchange with a signed request instead.
    pub fn from_env(require_api_key: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(require_api_key, |var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(require_api_key: bool, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let private_key = lookup(PRIVATE_KEY_ENV_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSecret(PRIVATE_KEY_ENV_VAR))?;

        let api_key = lookup(API_KEY_ENV_VAR).filter(|k| !k.trim().is_empty());
        if require_api_key && api_key.is_none() {
            return Err(ConfigError::MissingSecret(API_KEY_ENV_VAR));
        }

        Self::new(api_key, &private_key)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// 0x-prefixed 64-digit hex private key.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn normalize_private_key(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
        None => U256::from_str_radix(raw, 10),
    }
    .map_err(|_| ConfigError::InvalidSecret(PRIVATE_KEY_ENV_VAR))?;

    Ok(format!("0x{}", hex::encode(value.to_be_bytes::<32>())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_key_normalized() {
        let secrets = Secrets::new(None, "255").unwrap();
        assert_eq!(secrets.private_key().len(), 66);
        assert!(secrets.private_key().ends_with("ff"));
        assert!(secrets.private_key().starts_with("0x00"));
    }

    #[test]
    fn test_hex_key_padded() {
        let secrets = Secrets::new(None, "0x1").unwrap();
        assert_eq!(
            secrets.private_key(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_invalid_key() {
        assert!(Secrets::new(None, "not-a-key").is_err());
    }

    #[test]
    fn test_api_key_required_for_mint() {
        let err = Secrets::from_lookup(true, |var| {
            (var == PRIVATE_KEY_ENV_VAR).then(|| "0x1".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV_VAR));

        let ok = Secrets::from_lookup(false, |var| {
            (var == PRIVATE_KEY_ENV_VAR).then(|| "0x1".to_string())
        });
        assert!(ok.is_ok());
    }

    #[test]
    fn test_debug_redacts() {
        let secrets = Secrets::new(Some("api-key-value".into()), "0x1234").unwrap();
        let dump = format!("{:?}", secrets);
        assert!(!dump.contains("api-key-value"));
        assert!(!dump.contains("1234"));
    }
}
