//! NFT batch signing & submission library.
//!
//! Mints counterfactual NFTs from content identifiers and transfers a held
//! NFT to many recipients on a layer-2 exchange, one signed intent per item.

// Core subsystems
pub mod batch;
pub mod exchange;
pub mod signing;

// Inputs and outputs
pub mod audit;
pub mod config;
pub mod content;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use batch::{BatchError, BatchOrchestrator, Operation};
pub use config::BatchConfig;
pub use exchange::{ExchangeClient, RestExchangeClient};
pub use lifecycle::Shutdown;
pub use signing::SignatureEngine;
