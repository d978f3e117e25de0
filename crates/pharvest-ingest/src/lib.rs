//! pharvest ingest library
//!
//! A resilient retrieval-and-extraction pipeline for plasmid repository
//! records: given numeric identifiers, fetch the vendor's detail and
//! sequences pages, extract a fixed attribute schema from semi-structured
//! markup, download the annotated-sequence file, and hand immutable
//! records to a persistence sink.
//!
//! # Supported Vendors
//!
//! - **Addgene**: the reference profile (`addgene` module)
//!
//! # Example
//!
//! ```no_run
//! use pharvest_ingest::addgene::{AddgeneConfig, HarvestPipeline};
//! use pharvest_ingest::sink::CsvSink;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = HarvestPipeline::new(AddgeneConfig::default())?;
//!     let mut sink = CsvSink::create("plasmids.csv")?;
//!     let report = pipeline
//!         .run(&[42888, 22222], &mut sink, CancellationToken::new())
//!         .await?;
//!     tracing::info!(persisted = report.summary.persisted, "done");
//!     Ok(())
//! }
//! ```

pub mod addgene;
pub mod rate_limit;
pub mod retry;
pub mod sink;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use addgene::{AddgeneConfig, BatchReport};
use sink::PlasmidSink;

/// Run a harvest for the given vendor tag.
///
/// Only the Addgene profile is implemented today. An unrecognized tag
/// yields `Ok(None)` rather than an error: this is the extension point
/// where future vendors register their own URL-construction and
/// field-mapping strategy as sibling modules.
pub async fn harvest(
    vendor: &str,
    config: AddgeneConfig,
    ids: &[u32],
    sink: &mut dyn PlasmidSink,
    cancel: CancellationToken,
) -> addgene::Result<Option<BatchReport>> {
    match vendor {
        addgene::VENDOR_TAG => {
            let pipeline = addgene::HarvestPipeline::new(config)?;
            Ok(Some(pipeline.run(ids, sink, cancel).await?))
        },
        other => {
            warn!(vendor = other, "unrecognized vendor tag, nothing to harvest");
            Ok(None)
        },
    }
}
