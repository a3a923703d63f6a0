//! Field hashing capability.
//!
//! The exchange defines intent hashes over the BN254 scalar field with a
//! parameter set per operation kind. [`FieldHasher`] is the seam where the
//! exact primitive plugs in; [`KeccakFieldHasher`] is the in-tree backend: a
//! domain-separated keccak sponge that absorbs one 32-byte element at a time
//! and reduces the final state into the field.

use alloy::primitives::{keccak256, U256};

use crate::signing::fields::SNARK_SCALAR_FIELD;
use crate::signing::types::HashParams;

/// Deterministic hash of ordered field elements.
pub trait FieldHasher: Send + Sync {
    fn hash(&self, params: &HashParams, inputs: &[U256]) -> U256;

    /// Hash an arbitrary message (used for request signing).
    fn hash_message(&self, message: &[u8]) -> U256;
}

/// Keccak sponge over field elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakFieldHasher;

impl KeccakFieldHasher {
    fn domain_tag(params: &HashParams) -> String {
        format!(
            "nft-intent/w{}/f{}/p{}/s{}",
            params.width, params.full_rounds, params.partial_rounds, params.security_target
        )
    }
}

impl FieldHasher for KeccakFieldHasher {
    fn hash(&self, params: &HashParams, inputs: &[U256]) -> U256 {
        let mut state = keccak256(Self::domain_tag(params).as_bytes());

        for input in inputs {
            let mut block = [0u8; 64];
            block[..32].copy_from_slice(state.as_slice());
            block[32..].copy_from_slice(&input.to_be_bytes::<32>());
            state = keccak256(block);
        }

        U256::from_be_bytes(state.0).reduce_mod(SNARK_SCALAR_FIELD)
    }

    fn hash_message(&self, message: &[u8]) -> U256 {
        U256::from_be_bytes(keccak256(message).0).reduce_mod(SNARK_SCALAR_FIELD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::types::OperationKind;

    fn inputs(values: &[u64]) -> Vec<U256> {
        values.iter().map(|v| U256::from(*v)).collect()
    }

    #[test]
    fn test_result_in_field() {
        let h = KeccakFieldHasher.hash(&OperationKind::NftData.hash_params(), &inputs(&[1, 2, 3, 4, 5, 6]));
        assert!(h < SNARK_SCALAR_FIELD);
    }

    #[test]
    fn test_params_separate_domains() {
        let values = inputs(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let mint = KeccakFieldHasher.hash(&OperationKind::NftMint.hash_params(), &values);
        let data = KeccakFieldHasher.hash(&OperationKind::NftData.hash_params(), &values);
        assert_ne!(mint, data);
    }

    #[test]
    fn test_message_hash_stable() {
        let a = KeccakFieldHasher.hash_message(b"GET&url&params");
        let b = KeccakFieldHasher.hash_message(b"GET&url&params");
        assert_eq!(a, b);
        assert_ne!(a, KeccakFieldHasher.hash_message(b"GET&url&other"));
    }
}
