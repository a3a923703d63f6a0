//! Audit sinks.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::audit::record::AuditRecord;
use crate::audit::AuditError;

/// Receives the audit record of a batch.
///
/// Synchronous so it can run from a drop guard.
pub trait AuditSink: Send + Sync {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Pretty-printed JSON file (4-space indent), overwritten on every write.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<directory>/<file_name>`, creating the directory when missing.
    pub fn in_directory(directory: &Path, file_name: &str) -> Result<Self, AuditError> {
        std::fs::create_dir_all(directory)?;
        Ok(Self::new(directory.join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonFileSink {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);

        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        record.serialize(&mut serializer)?;
        writer.flush()?;

        tracing::info!(
            path = %self.path.display(),
            items = record.items.len(),
            "Audit record written"
        );
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemorySink {
    fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|_| AuditError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}
