//! Per-record directory sink.
//!
//! Materializes each record the way the reference tooling expects it on
//! disk: a `<root>/<name>/` directory holding the annotated-sequence file
//! (`<name>.gb`) and a one-row attributes CSV (`<name>_attributes.csv`).
//! Every path component passes through the sanitizer first, so hostile
//! names cannot escape the root or collide with each other.

use std::path::PathBuf;

use async_trait::async_trait;
use pharvest_common::sanitize_component;

use super::{PlasmidSink, Result};
use crate::addgene::Plasmid;

/// Writes one directory per record under a fixed root.
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PlasmidSink for DirectorySink {
    async fn persist(&mut self, record: &Plasmid) -> Result<()> {
        let name = sanitize_component(&record.name);
        let dir = self.root.join(&name);
        std::fs::create_dir_all(&dir)?;

        if let Some(sequence) = &record.sequence {
            std::fs::write(dir.join(format!("{}.gb", name)), sequence)?;
        }

        let mut writer = ::csv::Writer::from_path(dir.join(format!("{}_attributes.csv", name)))?;
        writer.serialize(record)?;
        writer.flush()?;

        Ok(())
    }
}
