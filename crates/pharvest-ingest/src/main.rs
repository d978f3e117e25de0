//! pharvest - plasmid repository harvesting tool

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pharvest_common::logging::{init_logging, LogConfig, LogLevel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pharvest_ingest::addgene::{AddgeneConfig, VENDOR_TAG};
use pharvest_ingest::sink::{CsvSink, DirectorySink, JsonLinesSink, MemorySink, PlasmidSink};

#[derive(Parser, Debug)]
#[command(name = "pharvest")]
#[command(author, version, about = "Plasmid repository harvesting tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest a batch of identifiers into a sink
    Harvest {
        /// Explicit identifiers, comma separated
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u32>,

        /// First identifier of an inclusive range
        #[arg(long, requires = "id_end")]
        id_start: Option<u32>,

        /// Last identifier of an inclusive range
        #[arg(long, requires = "id_start")]
        id_end: Option<u32>,

        /// Vendor profile
        #[arg(long, default_value = VENDOR_TAG)]
        vendor: String,

        /// Base URL of the vendor site
        #[arg(long)]
        base_url: Option<String>,

        /// Output path: file for csv/jsonl, root directory for dir
        #[arg(short, long, default_value = "./plasmids.csv")]
        output: PathBuf,

        /// Sink format
        #[arg(long, value_enum, default_value_t = SinkFormat::Csv)]
        format: SinkFormat,

        /// Worker pool size
        #[arg(long)]
        concurrency: Option<usize>,

        /// Outbound request budget shared by all workers
        #[arg(long)]
        requests_per_minute: Option<u64>,

        /// PostgreSQL connection string (with --format postgres)
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Fetch a single identifier and print the record as JSON
    Show {
        /// Identifier to fetch
        id: u32,

        /// Vendor profile
        #[arg(long, default_value = VENDOR_TAG)]
        vendor: String,

        /// Base URL of the vendor site
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SinkFormat {
    /// One CSV row per record
    Csv,
    /// One JSON document per record
    Jsonl,
    /// One directory per record (sequence file + attributes CSV)
    Dir,
    /// PostgreSQL table keyed by identifier
    #[cfg(feature = "database")]
    Postgres,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    match cli.command {
        Command::Harvest {
            ids,
            id_start,
            id_end,
            vendor,
            base_url,
            output,
            format,
            concurrency,
            requests_per_minute,
            database_url,
        } => {
            let ids = collect_ids(ids, id_start, id_end)?;
            let config = build_config(base_url, concurrency, requests_per_minute);
            let mut sink = build_sink(format, &output, database_url).await?;

            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, draining in-flight identifiers");
                    interrupt.cancel();
                }
            });

            info!(total = ids.len(), vendor = %vendor, "starting harvest");
            match pharvest_ingest::harvest(&vendor, config, &ids, sink.as_mut(), cancel).await? {
                Some(report) => {
                    info!(
                        persisted = report.summary.persisted,
                        skipped = report.summary.skipped,
                        failed = report.summary.failed,
                        "harvest complete"
                    );
                    for failure in &report.failures {
                        warn!(
                            id = failure.id,
                            stage = failure.stage.as_str(),
                            message = %failure.message,
                            "identifier failed"
                        );
                    }
                },
                None => bail!("unrecognized vendor '{}'", vendor),
            }
        },

        Command::Show {
            id,
            vendor,
            base_url,
        } => {
            let config = build_config(base_url, None, None);
            let mut sink = MemorySink::default();

            let report =
                pharvest_ingest::harvest(&vendor, config, &[id], &mut sink, CancellationToken::new())
                    .await?;

            let record = report
                .and_then(|r| r.records.into_iter().next())
                .with_context(|| format!("no record produced for identifier {}", id))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        },
    }

    Ok(())
}

/// Merge explicit identifiers with an optional inclusive range.
fn collect_ids(mut ids: Vec<u32>, id_start: Option<u32>, id_end: Option<u32>) -> Result<Vec<u32>> {
    if let (Some(start), Some(end)) = (id_start, id_end) {
        if start > end {
            bail!("--id-start {} is greater than --id-end {}", start, end);
        }
        ids.extend(start..=end);
    }
    if ids.is_empty() {
        bail!("no identifiers given; use --ids or --id-start/--id-end");
    }
    Ok(ids)
}

/// Environment configuration with CLI overrides applied on top.
fn build_config(
    base_url: Option<String>,
    concurrency: Option<usize>,
    requests_per_minute: Option<u64>,
) -> AddgeneConfig {
    let mut config = AddgeneConfig::from_env();
    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
    }
    if let Some(budget) = requests_per_minute {
        config.requests_per_minute = budget;
    }
    config
}

async fn build_sink(
    format: SinkFormat,
    output: &Path,
    database_url: Option<String>,
) -> Result<Box<dyn PlasmidSink>> {
    #[cfg(not(feature = "database"))]
    let _ = &database_url;

    match format {
        SinkFormat::Csv => Ok(Box::new(CsvSink::create(output)?)),
        SinkFormat::Jsonl => Ok(Box::new(JsonLinesSink::new(output))),
        SinkFormat::Dir => Ok(Box::new(DirectorySink::new(output))),
        #[cfg(feature = "database")]
        SinkFormat::Postgres => {
            let url = database_url
                .context("--database-url or DATABASE_URL is required for the postgres sink")?;
            Ok(Box::new(
                pharvest_ingest::sink::PostgresSink::connect(&url).await?,
            ))
        },
    }
}
