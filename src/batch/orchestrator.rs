//! Batch orchestration.
//!
//! # Responsibilities
//! - Walk the resolved entries strictly in order, one item at a time
//! - Hold the storage-id lease and hand it to the flow
//! - Gate the batch on a single fee approval before the first signature
//! - Record every trail and flush the audit record exactly once
//!
//! # Design Decisions
//! - The ledger is a drop guard: a panic or a dropped future still writes
//!   the record, with the in-flight trail under `abort`
//! - Cancellation is observed between awaits through `tokio::select!`; the
//!   in-flight item is abandoned, never retried

use std::sync::Arc;

use crate::audit::{AbortInfo, AuditError, AuditRecord, AuditSink, BatchHeader};
use crate::batch::confirm::Confirmer;
use crate::batch::fees::{estimate_batch_fees, FeeApproval};
use crate::batch::flow::{ItemFlow, Preparation};
use crate::batch::item::{BatchItem, ItemOutcome, ItemStatus, ItemTrail, Subject};
use crate::batch::source::SourceEntry;
use crate::batch::{BatchError, Operation};
use crate::exchange::StorageId;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// One line of the final summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub id: u64,
    pub subject: Subject,
    pub outcome: ItemOutcome,
    pub detail: Option<String>,
}

/// Result of a batch that ran to the end.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub operation: Operation,
    pub items: Vec<ItemSummary>,
    /// Lease after the last item, when the flow uses one.
    pub final_lease: Option<StorageId>,
}

impl BatchReport {
    pub fn count(&self, outcome: ItemOutcome) -> usize {
        self.items.iter().filter(|s| s.outcome == outcome).count()
    }
}

/// Audit state of a run; flushes itself if dropped unflushed.
struct AuditLedger {
    sink: Arc<dyn AuditSink>,
    header: BatchHeader,
    items: Vec<ItemTrail>,
    in_flight: Option<ItemTrail>,
    flushed: bool,
}

impl AuditLedger {
    fn new(sink: Arc<dyn AuditSink>, header: BatchHeader) -> Self {
        Self {
            sink,
            header,
            items: Vec::new(),
            in_flight: None,
            flushed: false,
        }
    }

    fn flush(&mut self, abort: Option<String>) -> Result<(), AuditError> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        if let Some(reason) = abort {
            self.header.abort = Some(AbortInfo {
                reason,
                in_flight: self.in_flight.take(),
            });
        }

        let record = AuditRecord {
            header: self.header.clone(),
            items: std::mem::take(&mut self.items),
        };
        self.sink.write(&record)
    }
}

impl Drop for AuditLedger {
    fn drop(&mut self) {
        if self.flushed {
            return;
        }
        let reason = if std::thread::panicking() {
            "panic"
        } else {
            "batch dropped before completion"
        };
        if let Err(e) = self.flush(Some(reason.to_string())) {
            tracing::error!(error = %e, "Failed to write audit record");
        }
    }
}

/// Runs an [`ItemFlow`] over a batch.
pub struct BatchOrchestrator<F: ItemFlow> {
    flow: F,
    confirmer: Arc<dyn Confirmer>,
    sink: Arc<dyn AuditSink>,
    shutdown: ShutdownSignal,
    skip_prompt: bool,
}

impl<F: ItemFlow> BatchOrchestrator<F> {
    pub fn new(
        flow: F,
        confirmer: Arc<dyn Confirmer>,
        sink: Arc<dyn AuditSink>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            flow,
            confirmer,
            sink,
            shutdown,
            skip_prompt: false,
        }
    }

    /// Approve fees without asking (`--noprompt`).
    pub fn skip_prompt(mut self, skip: bool) -> Self {
        self.skip_prompt = skip;
        self
    }

    /// Process `entries` in order and write the audit record.
    ///
    /// A fatal error stops the batch; the record still holds every trail
    /// finished so far, and the header names the reason and the partial
    /// trail of the item that was in flight. A batch error takes precedence
    /// over a failed audit write.
    pub async fn run(mut self, header: BatchHeader, entries: Vec<SourceEntry>) -> Result<BatchReport, BatchError> {
        let operation = self.flow.operation();
        let mut ledger = AuditLedger::new(self.sink.clone(), header);
        let mut report = BatchReport {
            operation,
            items: Vec::new(),
            final_lease: None,
        };
        let mut shutdown = self.shutdown.clone();

        tracing::info!(operation = operation.as_str(), entries = entries.len(), "Batch started");

        let result = tokio::select! {
            result = self.process(&mut ledger, &mut report, entries) => result,
            _ = shutdown.cancelled() => {
                tracing::warn!("Batch interrupted, abandoning in-flight item");
                Err(BatchError::Interrupted)
            }
        };

        match result {
            Ok(()) => {
                ledger.flush(None)?;
                tracing::info!(
                    operation = operation.as_str(),
                    succeeded = report.count(ItemOutcome::Succeeded),
                    exists = report.count(ItemOutcome::Exists),
                    failed = report.count(ItemOutcome::Failed),
                    skipped = report.count(ItemOutcome::Skipped),
                    simulated = report.count(ItemOutcome::Simulated),
                    "Batch finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "Batch aborted");
                if let Err(audit) = ledger.flush(Some(e.to_string())) {
                    tracing::error!(error = %audit, "Failed to write audit record");
                }
                Err(e)
            }
        }
    }

    async fn process(
        &mut self,
        ledger: &mut AuditLedger,
        report: &mut BatchReport,
        entries: Vec<SourceEntry>,
    ) -> Result<(), BatchError> {
        let operation = self.flow.operation();
        let total = entries.iter().filter(|e| e.skip.is_none()).count();

        if total == 0 {
            tracing::warn!("No item to process");
            for SourceEntry { item, skip } in entries {
                record_skipped(ledger, report, operation, &item, skip.unwrap_or_default());
            }
            return Ok(());
        }

        let bootstrap = self.flow.bootstrap().await?;
        ledger.header.context = bootstrap.context;
        let mut lease = bootstrap.lease;
        let mut approved = self.skip_prompt;
        let mut position = 0;

        for SourceEntry { item, skip } in entries {
            if let Some(reason) = skip {
                record_skipped(ledger, report, operation, &item, reason);
                continue;
            }
            position += 1;
            tracing::debug!(id = item.id, subject = %item.subject, position, total, "Processing item");

            let trail = ledger.in_flight.insert(ItemTrail::new(&item));

            let outcome = match self.flow.prepare(&item, lease, trail).await? {
                Preparation::Failed(reason) => {
                    tracing::warn!(id = item.id, reason = %reason, "Item failed before signing");
                    trail.fail(reason);
                    ItemOutcome::Failed
                }
                Preparation::Ready { prepared, fee } => {
                    if !approved {
                        let estimate = estimate_batch_fees(&fee, total)?;
                        let prompt = format!(
                            "{} {} item(s) of amount {}: estimated L2 fees {} {}. Continue?",
                            operation.as_str(),
                            total,
                            item.amount,
                            estimate.total,
                            estimate.token
                        );
                        let decision = self.confirmer.confirm(&prompt).await;
                        let approval = FeeApproval::new(decision, &estimate);
                        tracing::info!(
                            approval = decision,
                            fee = estimate.total,
                            token = %estimate.token,
                            count = estimate.count,
                            "Fee decision"
                        );
                        ledger.header.fee_approval = Some(approval.clone());
                        trail.approved_fees = Some(approval);
                        if !decision {
                            return Err(BatchError::Rejected);
                        }
                        approved = true;
                    }
                    trail.advance(ItemStatus::Approved);

                    let completion = self.flow.complete(&item, prepared, &fee, trail).await?;
                    if completion.lease.is_some() {
                        lease = completion.lease;
                    }
                    completion.outcome
                }
            };

            let detail = trail.error.clone();
            if let Some(finished) = ledger.in_flight.take() {
                ledger.items.push(finished);
            }

            tracing::info!(
                id = item.id,
                subject = %item.subject,
                position,
                total,
                outcome = outcome.as_str(),
                "Item finished"
            );
            metrics::record_item_outcome(operation.as_str(), outcome.as_str());
            report.items.push(ItemSummary {
                id: item.id,
                subject: item.subject,
                outcome,
                detail,
            });
        }

        report.final_lease = lease;
        Ok(())
    }
}

fn record_skipped(
    ledger: &mut AuditLedger,
    report: &mut BatchReport,
    operation: Operation,
    item: &BatchItem,
    reason: String,
) {
    tracing::info!(id = item.id, subject = %item.subject, reason = %reason, "Item skipped");
    metrics::record_item_outcome(operation.as_str(), ItemOutcome::Skipped.as_str());
    ledger.items.push(ItemTrail::skipped(item, reason.clone()));
    report.items.push(ItemSummary {
        id: item.id,
        subject: item.subject.clone(),
        outcome: ItemOutcome::Skipped,
        detail: Some(reason),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;

    #[test]
    fn test_ledger_flushes_on_drop() {
        let sink = Arc::new(MemorySink::new());
        let header = BatchHeader::new(Operation::Mint, serde_json::json!({}), serde_json::json!({}));
        {
            let mut ledger = AuditLedger::new(sink.clone(), header);
            let item = BatchItem {
                id: 3,
                subject: Subject::Cid("QmX".into()),
                amount: 1,
            };
            ledger.in_flight = Some(ItemTrail::new(&item));
        }

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let abort = records[0].header.abort.as_ref().unwrap();
        assert_eq!(abort.reason, "batch dropped before completion");
        assert_eq!(abort.in_flight.as_ref().unwrap().id, 3);
    }

    #[test]
    fn test_ledger_flushes_once() {
        let sink = Arc::new(MemorySink::new());
        let header = BatchHeader::new(Operation::Mint, serde_json::json!({}), serde_json::json!({}));
        let mut ledger = AuditLedger::new(sink.clone(), header);
        ledger.flush(None).unwrap();
        ledger.flush(Some("again".into())).unwrap();
        drop(ledger);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].header.abort.is_none());
    }
}
