//! Field-element parsing and rendering.

use alloy::primitives::{uint, U256};

use crate::signing::types::{SigningError, SigningResult};

/// Order of the BN254 scalar field all intent hashes live in.
pub const SNARK_SCALAR_FIELD: U256 =
    uint!(21888242871839275222246405745257275088548364400416034343698204186575808495617_U256);

/// Parse a hex string (with or without `0x`) into a field element.
pub fn parse_field(value: &str) -> SigningResult<U256> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(SigningError::MalformedField(value.to_string()));
    }

    let parsed = U256::from_str_radix(digits, 16)
        .map_err(|_| SigningError::MalformedField(value.to_string()))?;

    if parsed >= SNARK_SCALAR_FIELD {
        return Err(SigningError::MalformedField(value.to_string()));
    }
    Ok(parsed)
}

/// Parse a decimal integer string (e.g. a fee amount) into a field element.
pub fn parse_decimal_field(value: &str) -> SigningResult<U256> {
    let parsed = U256::from_str_radix(value.trim(), 10)
        .map_err(|_| SigningError::MalformedField(value.to_string()))?;
    if parsed >= SNARK_SCALAR_FIELD {
        return Err(SigningError::MalformedField(value.to_string()));
    }
    Ok(parsed)
}

/// `0x`-prefixed hex without leading zeros (`0x0` for zero).
pub fn to_hex(value: &U256) -> String {
    let padded = hex::encode(value.to_be_bytes::<32>());
    let trimmed = padded.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

/// `0x`-prefixed, zero-padded 64-digit hex.
pub fn to_hex_padded(value: &U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let v = parse_field("0x00000000000000000000000000000000000000ff").unwrap();
        assert_eq!(v, U256::from(255u64));
        assert_eq!(parse_field("FF").unwrap(), U256::from(255u64));
    }

    #[test]
    fn test_malformed() {
        assert!(parse_field("").is_err());
        assert!(parse_field("0x").is_err());
        assert!(parse_field("0xzz").is_err());
        assert!(parse_decimal_field("12a").is_err());
    }

    #[test]
    fn test_out_of_field() {
        let too_big = to_hex_padded(&SNARK_SCALAR_FIELD);
        assert!(parse_field(&too_big).is_err());
    }

    #[test]
    fn test_hex_rendering() {
        assert_eq!(to_hex(&U256::ZERO), "0x0");
        assert_eq!(to_hex(&U256::from(0xabcu64)), "0xabc");
        let padded = to_hex_padded(&U256::from(1u64));
        assert_eq!(padded.len(), 66);
        assert!(padded.ends_with("01"));
    }
}
