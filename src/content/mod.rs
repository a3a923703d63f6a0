//! Content addressing.
//!
//! # Responsibilities
//! - Validate CIDv0 identifiers before any network activity
//! - Derive the 32-byte NftId signed into every NftData hash
//! - Produce CIDs for local files through a scoped hashing container

use std::time::Duration;

use thiserror::Error;

pub mod cid;
pub mod generator;

pub use cid::{validate_cid, NftId};
pub use generator::CidGenerator;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Invalid CID {cid:?}: {reason}")]
    InvalidCid { cid: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Docker error: {0}")]
    Docker(String),

    #[error("CID generator not ready on port {port} after {waited:?}")]
    NotReady { port: u16, waited: Duration },

    #[error("CID generator request failed: {0}")]
    Http(#[from] reqwest::Error),
}
