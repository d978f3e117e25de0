// Batch pipeline orchestration
//
// Each identifier moves through a fixed lifecycle:
//
//   FETCHING -> CHECKING_EXISTENCE -> EXTRACTING -> (DISCARDED | ASSEMBLED) -> PERSISTED
//
// Identifiers are independent units of work on a bounded worker pool.
// Retry state is local to each unit; the shared pieces are the rate gate
// in front of the HTTP clients and the single consumer that owns the sink
// and the accumulation, so a record becomes visible only once fully
// assembled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    AddgeneConfig, AddgeneError, FieldExtractor, PageFetcher, Plasmid, Result, SequenceResolver,
};
use crate::rate_limit::RateGate;
use crate::retry::RetryPolicy;
use crate::sink::PlasmidSink;

/// Lifecycle stage of one identifier's unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    CheckingExistence,
    Extracting,
    Discarded,
    Assembled,
    Persisted,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Fetching => "fetching",
            Stage::CheckingExistence => "checking_existence",
            Stage::Extracting => "extracting",
            Stage::Discarded => "discarded",
            Stage::Assembled => "assembled",
            Stage::Persisted => "persisted",
        }
    }
}

/// Why an identifier was skipped without producing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The remote sentinel said there is no such identifier.
    NotFound,
    /// No resolvable material name (pooled or aggregate resources).
    NameUnresolvable,
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            SkipReason::NotFound => "not_found",
            SkipReason::NameUnresolvable => "name_unresolvable",
        }
    }
}

/// Outcome of one identifier's unit of work.
enum TaskOutcome {
    Assembled(Box<Plasmid>),
    Skipped(SkipReason),
    Failed { stage: Stage, error: AddgeneError },
}

/// A per-identifier failure surfaced in the batch report.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub id: u32,
    /// Stage in which processing stopped.
    pub stage: Stage,
    pub message: String,
}

/// End-of-run tally for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Everything one batch run produced. Owned by the caller; repeated or
/// concurrent runs cannot cross-contaminate.
#[derive(Debug)]
pub struct BatchReport {
    /// Every assembled record, in completion order.
    pub records: Vec<Plasmid>,
    /// Per-identifier failures (transport exhaustion, sink rejections).
    pub failures: Vec<BatchFailure>,
    pub summary: HarvestSummary,
}

impl BatchReport {
    /// Records keyed by name. Duplicate names across identifiers collapse
    /// to the record completed last (a deliberate policy, not an
    /// accident); the ordered `records` collection keeps every record.
    pub fn by_name(&self) -> HashMap<&str, &Plasmid> {
        let mut map = HashMap::new();
        for record in &self.records {
            map.insert(record.name.as_str(), record);
        }
        map
    }
}

/// Fetch, extract, assemble, and persist a batch of identifiers.
pub struct HarvestPipeline {
    config: AddgeneConfig,
    fetcher: PageFetcher,
    extractor: FieldExtractor,
    resolver: SequenceResolver,
    policy: RetryPolicy,
}

impl HarvestPipeline {
    pub fn new(config: AddgeneConfig) -> Result<Self> {
        let gate = Arc::new(RateGate::per_minute(config.requests_per_minute));
        let policy = config.retry_policy();

        let fetcher = PageFetcher::new(config.clone(), Arc::clone(&gate))?;
        let resolver =
            SequenceResolver::new(Duration::from_secs(config.timeout_secs), gate, &policy)?;
        let extractor = FieldExtractor::new()?;

        Ok(Self {
            config,
            fetcher,
            extractor,
            resolver,
            policy,
        })
    }

    /// Run one batch. Processing continues past per-identifier failures;
    /// cancelling stops intake and drains in-flight identifiers without
    /// losing accumulated records.
    pub async fn run(
        &self,
        ids: &[u32],
        sink: &mut dyn PlasmidSink,
        cancel: CancellationToken,
    ) -> Result<BatchReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            total = ids.len(),
            concurrency = self.config.concurrency,
            "starting harvest batch"
        );

        let progress = ProgressBar::new(ids.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        let concurrency = self.config.concurrency.max(1);
        let (tx, mut rx) = mpsc::channel::<(u32, TaskOutcome)>(concurrency);

        let intake_cancel = cancel.clone();
        let workers = async move {
            stream::iter(ids.iter().copied())
                .take_while(|_| {
                    let keep = !intake_cancel.is_cancelled();
                    async move { keep }
                })
                .map(|id| {
                    let tx = tx.clone();
                    async move {
                        let outcome = self.process_identifier(id).await;
                        // A closed channel means the consumer is gone;
                        // nothing left to do with the outcome.
                        let _ = tx.send((id, outcome)).await;
                    }
                })
                .buffer_unordered(concurrency)
                .collect::<()>()
                .await;
        };

        let consumer = async {
            let mut records: Vec<Plasmid> = Vec::new();
            let mut failures: Vec<BatchFailure> = Vec::new();
            let (mut persisted, mut skipped, mut failed) = (0usize, 0usize, 0usize);

            while let Some((id, outcome)) = rx.recv().await {
                match outcome {
                    TaskOutcome::Assembled(record) => {
                        match sink.persist(&record).await {
                            Ok(()) => {
                                persisted += 1;
                                debug!(id, name = %record.name, stage = Stage::Persisted.as_str(), "record persisted");
                            },
                            Err(err) => {
                                failed += 1;
                                warn!(id, error = %err, "sink rejected record");
                                failures.push(BatchFailure {
                                    id,
                                    stage: Stage::Persisted,
                                    message: err.to_string(),
                                });
                            },
                        }
                        // The record stays in the batch output either way:
                        // a persistence failure is surfaced, never used to
                        // silently drop an assembled record.
                        records.push(*record);
                    },
                    TaskOutcome::Skipped(reason) => {
                        skipped += 1;
                        info!(id, reason = reason.as_str(), "identifier skipped");
                    },
                    TaskOutcome::Failed { stage, error } => {
                        failed += 1;
                        warn!(id, stage = stage.as_str(), error = %error, "identifier failed");
                        failures.push(BatchFailure {
                            id,
                            stage,
                            message: error.to_string(),
                        });
                    },
                }
                progress.inc(1);
            }

            (records, failures, persisted, skipped, failed)
        };

        let ((), (records, failures, persisted, skipped, failed)) =
            tokio::join!(workers, consumer);

        progress.finish_and_clear();
        sink.flush().await?;

        if cancel.is_cancelled() {
            info!(run_id = %run_id, "batch cancelled; in-flight identifiers drained");
        }

        let summary = HarvestSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total: ids.len(),
            persisted,
            skipped,
            failed,
        };
        info!(
            run_id = %run_id,
            persisted = summary.persisted,
            skipped = summary.skipped,
            failed = summary.failed,
            "harvest batch finished"
        );

        Ok(BatchReport {
            records,
            failures,
            summary,
        })
    }

    /// One identifier's unit of work. Retry and backoff state live
    /// entirely inside this call.
    async fn process_identifier(&self, id: u32) -> TaskOutcome {
        debug!(id, stage = Stage::Fetching.as_str(), "processing identifier");

        let pages = match self.policy.run(|| self.fetcher.fetch_pages(id)).await {
            Ok(pages) => pages,
            Err(error) => {
                return TaskOutcome::Failed {
                    stage: Stage::Fetching,
                    error,
                }
            },
        };

        // Parsed documents are queried inside this synchronous scope and
        // dropped before the next await: extraction happens before
        // assembly, and assembly before anything is visible outside the
        // task.
        let (name, draft, sequence_href) = {
            let detail = Html::parse_document(&pages.detail);

            debug!(id, stage = Stage::CheckingExistence.as_str(), "checking existence");
            if self.extractor.is_not_found(&detail) {
                return TaskOutcome::Skipped(SkipReason::NotFound);
            }

            let name = match self.extractor.name(&detail) {
                Some(name) => name,
                None => {
                    debug!(id, stage = Stage::Discarded.as_str(), "no resolvable name");
                    return TaskOutcome::Skipped(SkipReason::NameUnresolvable);
                },
            };

            debug!(id, stage = Stage::Extracting.as_str(), "extracting fields");
            let draft = self.extractor.draft(&detail, &self.policy);

            let sequence_href = pages.sequences.as_deref().and_then(|markup| {
                let doc = Html::parse_document(markup);
                self.resolver.locate(&doc)
            });

            (name, draft, sequence_href)
        };

        let sequence = match sequence_href {
            Some(href) => self.resolver.download(id, &href).await,
            None => {
                debug!(id, "no sequence file published");
                None
            },
        };

        let record = Plasmid::assemble(id, name, self.config.detail_url(id), draft, sequence);
        debug!(id, stage = Stage::Assembled.as_str(), name = %record.name, "record assembled");

        TaskOutcome::Assembled(Box::new(record))
    }
}
