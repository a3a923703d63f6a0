//! Batch items, their lifecycle states and audit trails.

use serde::Serialize;
use serde_json::{json, Value};

use crate::batch::fees::FeeApproval;
use crate::exchange::{CounterfactualNft, CounterfactualNftInfo, ExchangeResponse, OffchainFee, StorageId};

/// What an item acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// CIDv0 of the content to mint.
    Cid(String),
    /// Transfer recipient: hex address, ENS name or decimal account id.
    To(String),
}

impl Subject {
    pub fn as_str(&self) -> &str {
        match self {
            Subject::Cid(s) | Subject::To(s) => s,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub id: u64,
    pub subject: Subject,
    pub amount: u64,
}

/// Lifecycle of one item.
///
/// ```text
/// Pending → Sequenced → AddressResolved → FeeQuoted → Approved → Signed
///         → Submitted → DoneSuccess | DoneExists | DoneFailed
/// ```
/// plus `Skipped` and `DoneSimulated`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Sequenced,
    AddressResolved,
    FeeQuoted,
    Approved,
    Signed,
    Submitted,
    DoneSuccess,
    DoneExists,
    DoneFailed,
    DoneSimulated,
    Skipped,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemStatus::DoneSuccess
                | ItemStatus::DoneExists
                | ItemStatus::DoneFailed
                | ItemStatus::DoneSimulated
                | ItemStatus::Skipped
        )
    }
}

/// Final result of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Exists,
    Failed,
    Skipped,
    Simulated,
}

impl ItemOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemOutcome::Succeeded => "succeeded",
            ItemOutcome::Exists => "exists",
            ItemOutcome::Failed => "failed",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::Simulated => "simulated",
        }
    }

    pub fn status(self) -> ItemStatus {
        match self {
            ItemOutcome::Succeeded => ItemStatus::DoneSuccess,
            ItemOutcome::Exists => ItemStatus::DoneExists,
            ItemOutcome::Failed => ItemStatus::DoneFailed,
            ItemOutcome::Skipped => ItemStatus::Skipped,
            ItemOutcome::Simulated => ItemStatus::DoneSimulated,
        }
    }
}

/// Status plus every artefact an item produced, as written to the audit file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemTrail {
    pub id: u64,
    #[serde(flatten)]
    pub subject: Subject,
    pub amount: u64,
    pub status: ItemStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<StorageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterfactual_nft_info: Option<CounterfactualNftInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterfactual_nft: Option<CounterfactualNft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub off_chain_fee: Option<OffchainFee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_fees: Option<FeeApproval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_data_poseidon_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_poseidon_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eddsa_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_mint_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_account: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_transfer_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemTrail {
    pub fn new(item: &BatchItem) -> Self {
        Self {
            id: item.id,
            subject: item.subject.clone(),
            amount: item.amount,
            status: ItemStatus::Pending,
            storage_id: None,
            counterfactual_nft_info: None,
            counterfactual_nft: None,
            off_chain_fee: None,
            approved_fees: None,
            nft_id: None,
            nft_data_poseidon_hash: None,
            nft_poseidon_hash: None,
            eddsa_signature: None,
            nft_data: None,
            nft_mint_response: None,
            to_account: None,
            to_address: None,
            nft_transfer_response: None,
            skipped: None,
            error: None,
        }
    }

    pub fn skipped(item: &BatchItem, reason: impl Into<String>) -> Self {
        let mut trail = Self::new(item);
        trail.status = ItemStatus::Skipped;
        trail.skipped = Some(reason.into());
        trail
    }

    /// Move to `status`. Terminal trails never change again.
    pub fn advance(&mut self, status: ItemStatus) {
        if self.status.is_terminal() {
            tracing::warn!(id = self.id, from = ?self.status, to = ?status, "Ignoring transition out of terminal state");
            return;
        }
        self.status = status;
    }

    /// Mark the item failed with `reason`.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.error = Some(reason.into());
        self.advance(ItemStatus::DoneFailed);
    }
}

/// Audit snapshot of an exchange response.
pub fn response_snapshot<T: Serialize>(response: &ExchangeResponse<T>) -> Value {
    json!({
        "status": response.status,
        "body": response.body,
        "error": response.error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> BatchItem {
        BatchItem {
            id: 4,
            subject: Subject::Cid("QmTest".to_string()),
            amount: 2,
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut trail = ItemTrail::new(&item());
        trail.advance(ItemStatus::Sequenced);
        trail.advance(ItemStatus::DoneExists);
        trail.advance(ItemStatus::Submitted);
        assert_eq!(trail.status, ItemStatus::DoneExists);
    }

    #[test]
    fn test_trail_serializes_populated_fields_only() {
        let mut trail = ItemTrail::new(&item());
        trail.storage_id = Some(StorageId { order_id: 1, offchain_id: 3 });
        trail.advance(ItemStatus::Sequenced);

        let value = serde_json::to_value(&trail).unwrap();
        assert_eq!(value["id"], 4);
        assert_eq!(value["cid"], "QmTest");
        assert_eq!(value["amount"], 2);
        assert_eq!(value["status"], "sequenced");
        assert_eq!(value["storage_id"]["offchainId"], 3);
        assert!(value.get("eddsa_signature").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_skipped_trail() {
        let trail = ItemTrail::skipped(&item(), "outside range");
        let value = serde_json::to_value(&trail).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["skipped"], "outside range");
    }

    #[test]
    fn test_recipient_subject_key() {
        let item = BatchItem {
            id: 1,
            subject: Subject::To("alice.eth".to_string()),
            amount: 1,
        };
        let value = serde_json::to_value(ItemTrail::new(&item)).unwrap();
        assert_eq!(value["to"], "alice.eth");
    }

    #[test]
    fn test_outcome_maps_to_terminal_status() {
        for outcome in [
            ItemOutcome::Succeeded,
            ItemOutcome::Exists,
            ItemOutcome::Failed,
            ItemOutcome::Skipped,
            ItemOutcome::Simulated,
        ] {
            assert!(outcome.status().is_terminal());
        }
    }
}
