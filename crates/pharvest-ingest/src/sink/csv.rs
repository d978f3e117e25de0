//! Flat-file CSV sink.
//!
//! One row per record, keyed by name. Absent attributes become empty
//! cells here and nowhere earlier; reading the file back maps empty cells
//! to absent again, so a round trip preserves every non-null value.

use std::fs::File;
use std::path::Path;

use async_trait::async_trait;

use super::{PlasmidSink, Result};
use crate::addgene::Plasmid;

/// Appends records as CSV rows to a single flat file.
pub struct CsvSink {
    writer: ::csv::Writer<File>,
}

impl CsvSink {
    /// Create (or truncate) the target file. The header row is written
    /// with the first record.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let writer = ::csv::WriterBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        Ok(Self { writer })
    }

    /// Read a previously written file back into records. Empty cells
    /// deserialize to absent.
    pub fn read_back(path: impl AsRef<Path>) -> Result<Vec<Plasmid>> {
        let mut reader = ::csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

#[async_trait]
impl PlasmidSink for CsvSink {
    async fn persist(&mut self, record: &Plasmid) -> Result<()> {
        self.writer.serialize(record)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
