//! Persistence sinks for assembled records.
//!
//! A sink consumes one fully-assembled [`Plasmid`] per call; the batch
//! consumer invokes it exactly once per record. Absent attributes cross
//! this boundary as `None` and each sink resolves them to its own
//! convention (empty CSV cell, JSON null, SQL NULL), never earlier.
//!
//! Every sink either parameter-binds its values or writes through a
//! serializer that quotes them; none of them interpolates record text
//! into its output format by hand.

use async_trait::async_trait;
use thiserror::Error;

use crate::addgene::Plasmid;

pub mod csv;
pub mod dir;
pub mod jsonl;
#[cfg(feature = "database")]
pub mod postgres;

pub use self::csv::CsvSink;
pub use self::dir::DirectorySink;
pub use self::jsonl::JsonLinesSink;
#[cfg(feature = "database")]
pub use self::postgres::PostgresSink;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Error types for persistence
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A persistence target for assembled records.
///
/// A rejected record is surfaced in the batch report; the pipeline never
/// drops an assembled record on a persistence error.
#[async_trait]
pub trait PlasmidSink: Send {
    /// Persist one record.
    async fn persist(&mut self, record: &Plasmid) -> Result<()>;

    /// Flush buffered state at the end of a batch.
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink for tests and one-off inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Plasmid>,
}

#[async_trait]
impl PlasmidSink for MemorySink {
    async fn persist(&mut self, record: &Plasmid) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
