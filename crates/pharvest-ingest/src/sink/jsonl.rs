//! JSON Lines sink.
//!
//! One JSON document per record, keyed by name. Absent attributes become
//! JSON nulls through serde; nothing is stringified by hand.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_jsonlines::{append_json_lines, json_lines};

use super::{PlasmidSink, Result};
use crate::addgene::Plasmid;

/// Appends records as JSON Lines to a single file.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read a previously written file back into records.
    pub fn read_back(path: impl AsRef<Path>) -> Result<Vec<Plasmid>> {
        let records = json_lines(path)?.collect::<std::io::Result<Vec<Plasmid>>>()?;
        Ok(records)
    }
}

#[async_trait]
impl PlasmidSink for JsonLinesSink {
    async fn persist(&mut self, record: &Plasmid) -> Result<()> {
        append_json_lines(&self.path, [record])?;
        Ok(())
    }
}
