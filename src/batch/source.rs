//! Input-source strategies and range filtering.
//!
//! Sources are resolved into an ordered list of entries before any network
//! activity. Filtering never reorders; entries outside the range, or with an
//! unusable recipient, carry a skip reason instead of being dropped.

use std::path::PathBuf;

use serde::Deserialize;

use crate::batch::item::{BatchItem, Subject};
use crate::batch::{BatchError, Operation};
use crate::content::validate_cid;

/// Where the items of a batch come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// One identifier from the command line, numbered 1.
    Single(Subject),
    /// JSON array of `{"ID": n, "CID": "Qm..."}` objects (mint).
    JsonList(PathBuf),
    /// One recipient per line, numbered by line (transfer).
    RecipientFile(PathBuf),
}

/// Inclusive id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFilter {
    pub start: u64,
    pub end: Option<u64>,
}

impl RangeFilter {
    /// `start` defaults to 1; an `end` before `start` is a configuration error.
    pub fn new(start: Option<u64>, end: Option<u64>) -> Result<Self, BatchError> {
        let start = start.unwrap_or(1);
        if let Some(end) = end {
            if start > end {
                return Err(BatchError::Config(format!(
                    "start {} must not be greater than end {}",
                    start, end
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, id: u64) -> bool {
        id >= self.start && self.end.map_or(true, |end| id <= end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start <= 1 && self.end.is_none()
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self { start: 1, end: None }
    }
}

/// A resolved item and, when it will not be processed, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub item: BatchItem,
    pub skip: Option<String>,
}

impl SourceEntry {
    pub fn process(item: BatchItem) -> Self {
        Self { item, skip: None }
    }

    pub fn skip(item: BatchItem, reason: impl Into<String>) -> Self {
        Self {
            item,
            skip: Some(reason.into()),
        }
    }
}

/// Parsed transfer recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Address(String),
    Ens(String),
    AccountId(u64),
}

impl Recipient {
    /// Classify a recipient string: `0x` hex address, `.eth` name, or a
    /// canonical decimal account id.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(digits) = raw.strip_prefix("0x") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(Recipient::Address(raw.to_string()));
            }
        }
        if raw.len() > 4 && raw.ends_with(".eth") {
            return Some(Recipient::Ens(raw.to_string()));
        }
        match raw.parse::<u64>() {
            Ok(id) if id.to_string() == raw => Some(Recipient::AccountId(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CidListEntry {
    #[serde(rename = "ID", alias = "id")]
    id: u64,
    #[serde(rename = "CID", alias = "cid")]
    cid: String,
}

/// Resolve `source` into ordered entries.
///
/// CIDs of entries that will be processed are validated here; a malformed
/// CID is a configuration error.
pub fn resolve_source(
    source: &BatchSource,
    operation: Operation,
    range: RangeFilter,
    amount: u64,
) -> Result<Vec<SourceEntry>, BatchError> {
    let entries = match source {
        BatchSource::Single(subject) => {
            if !range.is_unbounded() {
                tracing::warn!(subject = %subject, "Range filter ignored for a single item");
            }
            let item = BatchItem {
                id: 1,
                subject: subject.clone(),
                amount,
            };
            vec![classify(item, operation)?]
        }
        BatchSource::JsonList(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| BatchError::Config(format!("cannot read {}: {}", path.display(), e)))?;
            let list: Vec<CidListEntry> = serde_json::from_str(&content)
                .map_err(|e| BatchError::Config(format!("cannot parse {}: {}", path.display(), e)))?;

            let mut entries = Vec::with_capacity(list.len());
            for entry in list {
                let item = BatchItem {
                    id: entry.id,
                    subject: Subject::Cid(entry.cid),
                    amount,
                };
                if range.contains(item.id) {
                    entries.push(classify(item, operation)?);
                } else {
                    entries.push(SourceEntry::skip(item, "outside range"));
                }
            }
            entries
        }
        BatchSource::RecipientFile(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| BatchError::Config(format!("cannot read {}: {}", path.display(), e)))?;

            let mut entries = Vec::new();
            for (index, line) in content.lines().enumerate() {
                let to = line.trim();
                if to.is_empty() {
                    continue;
                }
                let item = BatchItem {
                    id: index as u64 + 1,
                    subject: Subject::To(to.to_string()),
                    amount,
                };
                if range.contains(item.id) {
                    entries.push(classify(item, operation)?);
                } else {
                    entries.push(SourceEntry::skip(item, "outside range"));
                }
            }
            entries
        }
    };

    let to_process = entries.iter().filter(|e| e.skip.is_none()).count();
    tracing::info!(
        operation = operation.as_str(),
        total = entries.len(),
        to_process,
        "Batch source resolved"
    );
    Ok(entries)
}

fn classify(item: BatchItem, operation: Operation) -> Result<SourceEntry, BatchError> {
    match (&item.subject, operation) {
        (Subject::Cid(cid), Operation::Mint) => {
            validate_cid(cid).map_err(|e| BatchError::Config(e.to_string()))?;
            Ok(SourceEntry::process(item))
        }
        (Subject::To(to), Operation::Transfer) => {
            if Recipient::parse(to).is_some() {
                Ok(SourceEntry::process(item))
            } else {
                tracing::warn!(id = item.id, to = %to, "Skipping invalid recipient");
                Ok(SourceEntry::skip(item, "invalid recipient"))
            }
        }
        (subject, operation) => Err(BatchError::Config(format!(
            "{} cannot be used for a {} batch",
            subject,
            operation.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cid(seed: u8) -> String {
        let mut multihash = vec![0x12, 0x20];
        multihash.extend(std::iter::repeat(seed).take(32));
        bs58::encode(multihash).into_string()
    }

    fn cid_list(ids: &[u64]) -> tempfile::NamedTempFile {
        let entries: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({"ID": id, "CID": cid(*id as u8)}))
            .collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::Value::Array(entries)).unwrap();
        file
    }

    #[test]
    fn test_range_filter_keeps_order() {
        let file = cid_list(&[1, 2, 3, 4, 5]);
        let source = BatchSource::JsonList(file.path().to_path_buf());
        let entries = resolve_source(&source, Operation::Mint, RangeFilter::new(Some(2), Some(4)).unwrap(), 1).unwrap();

        let processed: Vec<u64> = entries.iter().filter(|e| e.skip.is_none()).map(|e| e.item.id).collect();
        let skipped: Vec<u64> = entries.iter().filter(|e| e.skip.is_some()).map(|e| e.item.id).collect();
        assert_eq!(processed, vec![2, 3, 4]);
        assert_eq!(skipped, vec![1, 5]);
        assert_eq!(entries.iter().map(|e| e.item.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = RangeFilter::new(Some(4), Some(2)).unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
        assert!(err.to_string().contains("start 4"));

        assert!(RangeFilter::new(None, Some(0)).is_err());
        let single = RangeFilter::new(Some(3), Some(3)).unwrap();
        assert!(single.contains(3));
        assert!(!single.contains(2) && !single.contains(4));
        assert_eq!(RangeFilter::new(None, None).unwrap(), RangeFilter::default());
    }

    #[test]
    fn test_malformed_cid_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"ID": 1, "CID": "QmNotReallyACid"}}]"#).unwrap();
        let source = BatchSource::JsonList(file.path().to_path_buf());
        let err = resolve_source(&source, Operation::Mint, RangeFilter::default(), 1).unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn test_malformed_cid_outside_range_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"ID": 1, "CID": "QmNotReallyACid"}}, {{"ID": 2, "CID": "{}"}}]"#, cid(2)).unwrap();
        let source = BatchSource::JsonList(file.path().to_path_buf());
        let entries = resolve_source(&source, Operation::Mint, RangeFilter::new(Some(2), None).unwrap(), 1).unwrap();
        assert_eq!(entries[0].skip.as_deref(), Some("outside range"));
        assert!(entries[1].skip.is_none());
    }

    #[test]
    fn test_recipient_file_numbering() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0xabc123").unwrap();
        writeln!(file, "not-a-recipient").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "alice.eth").unwrap();
        writeln!(file, "12345").unwrap();
        let source = BatchSource::RecipientFile(file.path().to_path_buf());
        let entries = resolve_source(&source, Operation::Transfer, RangeFilter::default(), 3).unwrap();

        let ids: Vec<u64> = entries.iter().map(|e| e.item.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 5]);
        assert_eq!(entries[1].skip.as_deref(), Some("invalid recipient"));
        assert!(entries.iter().all(|e| e.item.amount == 3));
    }

    #[test]
    fn test_single_ignores_range() {
        let source = BatchSource::Single(Subject::Cid(cid(9)));
        let entries = resolve_source(&source, Operation::Mint, RangeFilter::new(Some(5), None).unwrap(), 1).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].skip.is_none());
    }

    #[test]
    fn test_subject_operation_mismatch() {
        let source = BatchSource::Single(Subject::To("alice.eth".into()));
        assert!(resolve_source(&source, Operation::Mint, RangeFilter::default(), 1).is_err());
    }

    #[test]
    fn test_recipient_classification() {
        assert_eq!(Recipient::parse("0xDeaD"), Some(Recipient::Address("0xDeaD".into())));
        assert_eq!(Recipient::parse("bob.loopring.eth"), Some(Recipient::Ens("bob.loopring.eth".into())));
        assert_eq!(Recipient::parse("42"), Some(Recipient::AccountId(42)));
        assert_eq!(Recipient::parse("042"), None);
        assert_eq!(Recipient::parse("0x"), None);
        assert_eq!(Recipient::parse("0xzz"), None);
        assert_eq!(Recipient::parse(".eth"), None);
    }

    #[test]
    fn test_lowercase_keys_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 7, "cid": "{}"}}]"#, cid(7)).unwrap();
        let source = BatchSource::JsonList(file.path().to_path_buf());
        let entries = resolve_source(&source, Operation::Mint, RangeFilter::default(), 1).unwrap();
        assert_eq!(entries[0].item.id, 7);
    }
}
