//! Batch fee estimation.

use serde::Serialize;

use crate::batch::BatchError;
use crate::exchange::Fee;

/// Decimals of the tokens the exchange accepts for fees.
pub fn token_decimals(symbol: &str) -> Option<u32> {
    match symbol {
        "ETH" | "LRC" | "DAI" => Some(18),
        "USDT" | "USDC" => Some(6),
        _ => None,
    }
}

/// Estimated fees for a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeEstimate {
    pub total: f64,
    pub token: String,
    pub count: usize,
}

/// `count * fee * discount / 10^decimals(token)`.
pub fn estimate_batch_fees(fee: &Fee, count: usize) -> Result<FeeEstimate, BatchError> {
    let decimals = token_decimals(&fee.token)
        .ok_or_else(|| BatchError::FeeQuote(format!("unknown fee token {:?}", fee.token)))?;
    let amount: u128 = fee
        .fee
        .trim()
        .parse()
        .map_err(|_| BatchError::FeeQuote(format!("non-integer fee {:?}", fee.fee)))?;

    let total = count as f64 * amount as f64 * fee.discount / 10f64.powi(decimals as i32);
    Ok(FeeEstimate {
        total,
        token: fee.token.clone(),
        count,
    })
}

/// The batch-level fee decision, recorded in the audit file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeApproval {
    pub approval: bool,
    pub fee: f64,
    pub token: String,
    pub count: usize,
}

impl FeeApproval {
    pub fn new(approval: bool, estimate: &FeeEstimate) -> Self {
        Self {
            approval,
            fee: estimate.total,
            token: estimate.token.clone(),
            count: estimate.count,
        }
    }
}
