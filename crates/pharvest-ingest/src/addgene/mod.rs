// Addgene vendor module
//
// Retrieval and extraction for the Addgene plasmid repository. One
// identifier maps to two pages (detail and sequences) and optionally one
// downloadable annotated-sequence file.
//
// Architecture, leaf-first:
// - Fetch: detail + sequences pages per identifier (fetcher)
// - Extract: labeled attribute blocks from the detail document (extractor)
// - Resolve: locate and download the sequence file (resolver)
// - Assemble: one immutable record per usable identifier (models)
// - Pipeline: batch orchestration over a bounded worker pool (pipeline)
//
// Only this vendor profile exists today; unrecognized vendor tags yield
// no result at the crate root rather than an error, so future vendors can
// slot in as sibling modules.

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod resolver;

pub use config::AddgeneConfig;
pub use extractor::FieldExtractor;
pub use fetcher::{PageFetcher, PageSet};
pub use models::{Plasmid, PlasmidDraft};
pub use pipeline::{
    BatchFailure, BatchReport, HarvestPipeline, HarvestSummary, SkipReason, Stage,
};
pub use resolver::SequenceResolver;

use crate::retry::Transient;

/// Vendor tag this module answers to.
pub const VENDOR_TAG: &str = "addgene";

/// Result type for Addgene operations
pub type Result<T> = std::result::Result<T, AddgeneError>;

/// Error types for Addgene harvesting
#[derive(Debug, thiserror::Error)]
pub enum AddgeneError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),
}

impl Transient for AddgeneError {
    /// Transport-level failures are retryable; data, configuration, and
    /// persistence failures are not. Server overload (5xx, 429) counts as
    /// transport.
    fn is_transient(&self) -> bool {
        match self {
            AddgeneError::Http(err) => err.is_timeout() || err.is_connect() || err.is_body(),
            AddgeneError::HttpStatus { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            },
            AddgeneError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            AddgeneError::Parse(_) | AddgeneError::Config(_) | AddgeneError::Sink(_) => false,
        }
    }
}
