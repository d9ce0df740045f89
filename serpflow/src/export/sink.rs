//! Destinations for the ordered records of a run.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;

use crate::core::SearchRecord;
use crate::errors::SerpResult;

/// Receives the records of a run in input order, page order within a job.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Accepts the records of a finished run.
    async fn write(&self, records: &[SearchRecord]) -> SerpResult<()>;
}

/// Writes records as a pretty JSON array to a file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// Creates a sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonFileSink {
    async fn write(&self, records: &[SearchRecord]) -> SerpResult<()> {
        let path = self.path.clone();
        let records = records.to_vec();
        tokio::task::spawn_blocking(move || super::write_json_file(path, &records))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SearchRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    #[must_use]
    pub fn records(&self) -> Vec<SearchRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, records: &[SearchRecord]) -> SerpResult<()> {
        self.records.lock().extend_from_slice(records);
        Ok(())
    }
}
