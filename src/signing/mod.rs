//! Intent signing subsystem.
//!
//! # Data Flow
//! ```text
//! Secrets (LOOPRING_PRIVATE_KEY)
//!     → signer.rs (key loading, signing)
//! ordered inputs per OperationKind
//!     → engine.rs (arity check, field order)
//!     → hasher.rs (field hash with the kind's parameter set)
//!     → signer.rs (signature over the hash)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from the environment
//! - Never log private keys or sensitive data

pub mod engine;
pub mod fields;
pub mod hasher;
pub mod signer;
pub mod types;

pub use engine::{NftDataInputs, NftMintInputs, NftTransferInputs, SignatureEngine};
pub use hasher::{FieldHasher, KeccakFieldHasher};
pub use signer::{IntentSigner, L2KeyPair};
pub use types::{EddsaSignature, HashParams, OperationKind, SignedIntent, SigningError, SigningResult};
