//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::BatchConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    MissingSecret(&'static str),
    InvalidSecret(&'static str),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => write!(f, "Invalid value for {}: {:?}", var, value),
            ConfigError::MissingSecret(var) => write!(f, "Missing secret ({})", var),
            ConfigError::InvalidSecret(var) => write!(f, "Invalid secret ({})", var),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, then apply process
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<BatchConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => BatchConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

/// Apply environment overrides using `lookup` as the variable source.
pub fn apply_env_overrides<F>(config: &mut BatchConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("EXCHANGE_BASE_URL") {
        config.exchange.base_url = v;
    }
    if let Some(v) = lookup("MINTER") {
        config.mint.minter_address = v;
    }
    if let Some(v) = lookup("ACCT_ID") {
        config.mint.account_id = Some(parse_env("ACCT_ID", &v)?);
    }
    if let Some(v) = lookup("NFT_TYPE") {
        config.mint.nft_type = parse_env("NFT_TYPE", &v)?;
    }
    if let Some(v) = lookup("ROYALTY_PERCENTAGE") {
        config.mint.royalty_percentage = parse_env("ROYALTY_PERCENTAGE", &v)?;
    }
    if let Some(v) = lookup("FEE_TOKEN_ID") {
        let fee_token_id: u32 = parse_env("FEE_TOKEN_ID", &v)?;
        config.mint.fee_token_id = fee_token_id;
        config.transfer.fee_token_id = fee_token_id;
    }
    if let Some(v) = lookup("FROM") {
        config.transfer.from = v;
    }
    if let Some(v) = lookup("AMOUNT") {
        config.batch.default_amount = parse_env("AMOUNT", &v)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}
