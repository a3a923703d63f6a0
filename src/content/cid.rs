//! CIDv0 validation and NftId derivation.

use alloy::primitives::U256;

use crate::content::ContentError;

/// sha2-256 multihash prefix: code 0x12, digest length 0x20.
const MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

/// 32-byte NFT identifier derived from a CIDv0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NftId([u8; 32]);

impl NftId {
    /// Derive the id from a CIDv0 string (`Qm...`).
    pub fn from_cid(cid: &str) -> Result<Self, ContentError> {
        let cid = cid.trim();
        if !cid.starts_with("Qm") {
            return Err(ContentError::InvalidCid {
                cid: cid.to_string(),
                reason: "only CIDv0 (Qm...) is supported".to_string(),
            });
        }

        let decoded = bs58::decode(cid).into_vec().map_err(|e| ContentError::InvalidCid {
            cid: cid.to_string(),
            reason: e.to_string(),
        })?;

        if decoded.len() != 34 || decoded[..2] != MULTIHASH_PREFIX {
            return Err(ContentError::InvalidCid {
                cid: cid.to_string(),
                reason: format!("expected a 34-byte sha2-256 multihash, got {} bytes", decoded.len()),
            });
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded[2..]);
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// First 16 bytes.
    pub fn high(&self) -> U256 {
        U256::from_be_slice(&self.0[..16])
    }

    /// Last 16 bytes.
    pub fn low(&self) -> U256 {
        U256::from_be_slice(&self.0[16..])
    }

    /// `0x` + 64 hex chars.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for NftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Check that `cid` is a usable CIDv0.
pub fn validate_cid(cid: &str) -> Result<(), ContentError> {
    NftId::from_cid(cid).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(7).wrapping_add(3);
        }
        bytes
    }

    fn cid_for(digest: &[u8; 32]) -> String {
        let mut multihash = MULTIHASH_PREFIX.to_vec();
        multihash.extend_from_slice(digest);
        bs58::encode(multihash).into_string()
    }

    #[test]
    fn test_nft_id_from_cid() {
        let digest = digest();
        let cid = cid_for(&digest);
        assert!(cid.starts_with("Qm"));

        let id = NftId::from_cid(&cid).unwrap();
        assert_eq!(id.to_bytes(), digest);
        assert_eq!(id.to_hex(), format!("0x{}", hex::encode(digest)));
        assert_eq!(id.to_hex().len(), 66);
    }

    #[test]
    fn test_halves() {
        let id = NftId::from_cid(&cid_for(&digest())).unwrap();
        let bytes = id.to_bytes();
        assert_eq!(id.high(), U256::from_be_slice(&bytes[..16]));
        assert_eq!(id.low(), U256::from_be_slice(&bytes[16..]));
        assert!(id.high() < U256::from(1u8) << 128usize);
        assert!(id.low() < U256::from(1u8) << 128usize);
    }

    #[test]
    fn test_rejects_non_v0() {
        let err = validate_cid("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").unwrap_err();
        assert!(err.to_string().contains("CIDv0"));
    }

    #[test]
    fn test_rejects_bad_base58() {
        // '0' and 'l' are outside the base58 alphabet
        assert!(validate_cid("Qm0l0l").is_err());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(validate_cid("QmShort").is_err());
    }
}
