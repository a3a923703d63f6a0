//! Layer-2 key handling and intent signing.
//!
//! # Security
//! - Private keys come ONLY from [`Secrets`](crate::config::Secrets)
//! - Keys are never logged or serialized
//! - Only the public key is ever written to logs

use alloy::primitives::U256;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::config::Secrets;
use crate::signing::types::{EddsaSignature, SigningError, SigningResult};

/// Produces signatures over intent hashes.
pub trait IntentSigner: Send + Sync {
    fn sign(&self, hash: &U256) -> SigningResult<EddsaSignature>;

    /// Hex-encoded public key, safe to log.
    fn public_key(&self) -> String;
}

/// EdDSA key pair used to authenticate intents.
pub struct L2KeyPair {
    signing_key: SigningKey,
}

impl L2KeyPair {
    /// Create a key pair from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix), at most 32 bytes
    pub fn from_private_key(private_key_hex: &str) -> SigningResult<Self> {
        let key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());

        // Left-pad odd-length and short keys to a full 32-byte scalar.
        let padded = format!("{:0>64}", key_hex);
        if padded.len() != 64 {
            return Err(SigningError::Key("private key longer than 32 bytes".to_string()));
        }

        let bytes = hex::decode(&padded)
            .map_err(|e| SigningError::Key(format!("Invalid private key format: {}", e)))?;
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);

        let signing_key = SigningKey::from_bytes(&seed);
        let pair = Self { signing_key };

        tracing::info!(public_key = %pair.public_key(), "Signing key loaded");
        Ok(pair)
    }

    /// Load the key pair from resolved secrets.
    pub fn from_secrets(secrets: &Secrets) -> SigningResult<Self> {
        Self::from_private_key(secrets.private_key())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Check a signature produced by this key.
    pub fn verify(&self, hash: &U256, signature: &EddsaSignature) -> bool {
        let Some(digits) = signature.0.strip_prefix("0x") else {
            return false;
        };
        let Ok(bytes) = hex::decode(digits) else {
            return false;
        };
        let Ok(raw) = <[u8; 64]>::try_from(bytes.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&raw);
        self.verifying_key()
            .verify(&hash.to_be_bytes::<32>(), &signature)
            .is_ok()
    }
}

impl IntentSigner for L2KeyPair {
    fn sign(&self, hash: &U256) -> SigningResult<EddsaSignature> {
        let signature = self.signing_key.sign(&hash.to_be_bytes::<32>());
        Ok(EddsaSignature(format!("0x{}", hex::encode(signature.to_bytes()))))
    }

    fn public_key(&self) -> String {
        format!("0x{}", hex::encode(self.verifying_key().to_bytes()))
    }
}

impl std::fmt::Debug for L2KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("L2KeyPair")
            .field("public_key", &self.public_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_sign_and_verify() {
        let pair = L2KeyPair::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let hash = U256::from(123456789u64);
        let signature = pair.sign(&hash).unwrap();

        // 0x + 64 bytes
        assert_eq!(signature.0.len(), 2 + 128);
        assert!(pair.verify(&hash, &signature));
        assert!(!pair.verify(&U256::from(1u64), &signature));
    }

    #[test]
    fn test_deterministic_signature() {
        let pair = L2KeyPair::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let hash = U256::from(42u64);
        assert_eq!(pair.sign(&hash).unwrap(), pair.sign(&hash).unwrap());
    }

    #[test]
    fn test_short_key_padded() {
        let a = L2KeyPair::from_private_key("0x1").unwrap();
        let b = L2KeyPair::from_private_key(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_invalid_key() {
        assert!(L2KeyPair::from_private_key("0xnothex").is_err());
        let too_long = format!("0x{}", "11".repeat(33));
        assert!(L2KeyPair::from_private_key(&too_long).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let pair = L2KeyPair::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let dump = format!("{:?}", pair);
        assert!(!dump.contains("4c0883a69102937d"));
    }
}
