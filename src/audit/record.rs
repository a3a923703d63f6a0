//! Audit record layout.
//!
//! ```text
//! [
//!     { "run_id": ..., "operation": ..., "args": ..., "config": ..., ... },  // header
//!     { "id": 1, "cid": "Qm...", "amount": 1, "status": "done_success", ... },
//!     ...
//! ]
//! ```

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::batch::fees::FeeApproval;
use crate::batch::item::ItemTrail;
use crate::batch::Operation;

/// Why a batch stopped early, and the item it stopped on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbortInfo {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_flight: Option<ItemTrail>,
}

/// Leading batch-level entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchHeader {
    pub run_id: Uuid,
    pub operation: Operation,
    pub started_at: u64,
    /// Command-line arguments of the run.
    pub args: Value,
    /// Resolved configuration. Holds no secrets.
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_approval: Option<FeeApproval>,
    /// Shared context established by the flow before the first item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort: Option<AbortInfo>,
}

impl BatchHeader {
    pub fn new(operation: Operation, args: Value, config: Value) -> Self {
        let started_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            run_id: Uuid::new_v4(),
            operation,
            started_at,
            args,
            config,
            fee_approval: None,
            context: None,
            abort: None,
        }
    }
}

/// Header followed by one trail per finished or skipped item.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub header: BatchHeader,
    pub items: Vec<ItemTrail>,
}

impl Serialize for AuditRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len() + 1))?;
        seq.serialize_element(&self.header)?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}
