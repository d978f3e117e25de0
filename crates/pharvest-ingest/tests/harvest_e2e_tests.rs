//! End-to-end pipeline tests against a mock vendor.
//!
//! These exercise the full fetch -> existence check -> extract -> resolve
//! -> assemble -> persist path, including:
//! - not-found identifiers skipping without touching the sink
//! - retry/backoff across transient transport failures
//! - per-identifier failure isolation
//! - duplicate-name accumulation policy
//! - sink round trips and surfaced persistence failures

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pharvest_ingest::addgene::{AddgeneConfig, HarvestPipeline, Plasmid, Stage};
use pharvest_ingest::sink::{CsvSink, MemorySink, PlasmidSink, SinkError};

const GENBANK_FILE: &str =
    "LOCUS       pLKO.1       7052 bp    DNA     circular SYN 01-JAN-2024\nORIGIN\n//\n";

fn detail_page(name: &str) -> String {
    format!(
        r#"<html>
        <head><title>Addgene: {name}</title></head>
        <body>
          <h1><span class="material-name">{name}</span></h1>
          <ul>
            <li class="field">Vector backbone pLKO.1 (Search Vector Database)</li>
            <li class="field">Vector type Lentiviral, RNAi</li>
            <li class="field">Selectable markers Puromycin</li>
            <li class="field">Bacterial Resistance(s) Ampicillin, 100 μg/mL</li>
            <li class="field">Growth Temperature 37°C</li>
            <li class="field">Growth Strain(s) ccdB Survival</li>
            <li class="field">Copy number High Copy</li>
            <li class="field">Gene/Insert name none</li>
            <li class="field">Total vector size (bp) 7052</li>
          </ul>
        </body>
        </html>"#
    )
}

fn detail_page_without_size(name: &str) -> String {
    format!(
        r#"<html><body>
          <span class="material-name">{name}</span>
          <li class="field">Copy number High Copy</li>
        </body></html>"#
    )
}

fn sequences_page(href: &str) -> String {
    format!(
        r#"<html><body>
          <a class="genbank-file-download" href="{href}">Download GenBank</a>
        </body></html>"#
    )
}

const SEQUENCES_PAGE_WITHOUT_LINK: &str =
    "<html><body><p>No full sequences are available.</p></body></html>";

const NOT_FOUND_PAGE: &str = "<html><body><h1>Page Not Found</h1></body></html>";

fn test_config(server: &MockServer) -> AddgeneConfig {
    AddgeneConfig::builder()
        .base_url(server.uri())
        .max_attempts(3)
        .retry_base_delay_ms(1)
        .retry_delay_scale_ms(1)
        .requests_per_minute(600_000)
        .concurrency(4)
        .build()
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_full_plasmid(server: &MockServer, id: u32, name: &str) {
    let file_route = format!("/media/{id}.gbk");
    mount_page(server, &format!("/{id}/"), detail_page(name)).await;
    mount_page(
        server,
        &format!("/{id}/sequences/"),
        sequences_page(&format!("{}{}", server.uri(), file_route)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(file_route))
        .and(header("user-agent", "Mozilla/5.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GENBANK_FILE))
        .mount(server)
        .await;
}

async fn run_batch(server: &MockServer, ids: &[u32]) -> (pharvest_ingest::addgene::BatchReport, MemorySink) {
    let pipeline = HarvestPipeline::new(test_config(server)).expect("pipeline");
    let mut sink = MemorySink::default();
    let report = pipeline
        .run(ids, &mut sink, CancellationToken::new())
        .await
        .expect("batch run");
    (report, sink)
}

#[tokio::test]
async fn not_found_and_full_record_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(NOT_FOUND_PAGE))
        .mount(&server)
        .await;
    mount_full_plasmid(&server, 42888, "pLKO.1 - TRC cloning vector").await;

    let (report, sink) = run_batch(&server, &[1, 42888]).await;

    assert_eq!(report.summary.persisted, 1);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.failed, 0);
    assert!(report.failures.is_empty());

    // The not-found identifier never reached the sink.
    assert_eq!(sink.records.len(), 1);

    let by_name = report.by_name();
    let record = by_name["pLKO.1 - TRC cloning vector"];
    assert_eq!(record.id, 42888);
    assert_eq!(record.size_bp, Some(7052));
    assert_eq!(record.backbone.as_deref(), Some("pLKO.1"));
    assert_eq!(record.vendor_url, format!("{}/42888/", server.uri()));
    assert_eq!(record.sequence.as_deref(), Some(GENBANK_FILE));
}

#[tokio::test]
async fn not_found_sentinel_in_a_successful_response_also_skips() {
    let server = MockServer::start().await;

    // Some deployments answer 200 with a not-found body; the sentinel
    // check must not depend on the status code.
    mount_page(&server, "/3/", NOT_FOUND_PAGE.to_string()).await;
    mount_page(&server, "/3/sequences/", NOT_FOUND_PAGE.to_string()).await;

    let (report, sink) = run_batch(&server, &[3]).await;
    assert_eq!(report.summary.skipped, 1);
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn absent_labels_still_produce_a_record() {
    let server = MockServer::start().await;

    mount_page(&server, "/26248/", detail_page_without_size("pBabe puro")).await;
    mount_page(
        &server,
        "/26248/sequences/",
        SEQUENCES_PAGE_WITHOUT_LINK.to_string(),
    )
    .await;

    let (report, _sink) = run_batch(&server, &[26248]).await;

    assert_eq!(report.summary.persisted, 1);
    let record = &report.records[0];
    assert_eq!(record.copy_number.as_deref(), Some("High Copy"));
    assert!(record.backbone.is_none());
    assert!(record.size_bp.is_none());
    assert!(record.sequence.is_none());
}

#[tokio::test]
async fn missing_name_discards_the_identifier() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/555/",
        "<html><body><p>pooled library, no single material</p></body></html>".to_string(),
    )
    .await;
    mount_page(
        &server,
        "/555/sequences/",
        SEQUENCES_PAGE_WITHOUT_LINK.to_string(),
    )
    .await;

    let (report, sink) = run_batch(&server, &[555]).await;
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.persisted, 0);
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let server = MockServer::start().await;

    // Two connection-level hiccups, then a healthy page.
    Mock::given(method("GET"))
        .and(path("/42888/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_full_plasmid(&server, 42888, "pLKO.1 - TRC cloning vector").await;

    let (report, _sink) = run_batch(&server, &[42888]).await;

    assert_eq!(report.summary.persisted, 1);
    assert_eq!(report.summary.failed, 0);
}

#[tokio::test]
async fn exhausted_retries_fail_only_that_identifier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/13/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3) // the whole attempt budget, then give up
        .mount(&server)
        .await;
    mount_full_plasmid(&server, 42888, "pLKO.1 - TRC cloning vector").await;

    let (report, sink) = run_batch(&server, &[13, 42888]).await;

    assert_eq!(report.summary.persisted, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(sink.records.len(), 1);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, 13);
    assert_eq!(report.failures[0].stage, Stage::Fetching);
}

#[tokio::test]
async fn duplicate_names_last_write_wins() {
    let server = MockServer::start().await;

    for id in [100, 200] {
        mount_page(&server, &format!("/{id}/"), detail_page_without_size("pSame")).await;
        mount_page(
            &server,
            &format!("/{id}/sequences/"),
            SEQUENCES_PAGE_WITHOUT_LINK.to_string(),
        )
        .await;
    }

    // Sequential processing pins the completion order.
    let config = AddgeneConfig::builder()
        .base_url(server.uri())
        .max_attempts(3)
        .retry_base_delay_ms(1)
        .retry_delay_scale_ms(1)
        .requests_per_minute(600_000)
        .concurrency(1)
        .build();
    let pipeline = HarvestPipeline::new(config).expect("pipeline");
    let mut sink = MemorySink::default();
    let report = pipeline
        .run(&[100, 200], &mut sink, CancellationToken::new())
        .await
        .expect("batch run");

    // Both records are kept in order; the by-name view keeps the last.
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.by_name().len(), 1);
    assert_eq!(report.by_name()["pSame"].id, 200);
}

#[tokio::test]
async fn size_falls_back_to_the_sequence_header() {
    let server = MockServer::start().await;

    let file_route = "/media/777.gbk";
    mount_page(&server, "/777/", detail_page_without_size("pFallback")).await;
    mount_page(
        &server,
        "/777/sequences/",
        sequences_page(&format!("{}{}", server.uri(), file_route)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(file_route))
        .respond_with(ResponseTemplate::new(200).set_body_string(GENBANK_FILE))
        .mount(&server)
        .await;

    let (report, _sink) = run_batch(&server, &[777]).await;

    // Third whitespace token of the LOCUS line.
    assert_eq!(report.records[0].size_bp, Some(7052));
}

#[tokio::test]
async fn csv_sink_round_trips_the_batch() {
    let server = MockServer::start().await;
    mount_full_plasmid(&server, 42888, "pLKO.1 - TRC cloning vector").await;

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("plasmids.csv");

    let pipeline = HarvestPipeline::new(test_config(&server)).expect("pipeline");
    let mut sink = CsvSink::create(&csv_path).unwrap();
    let report = pipeline
        .run(&[42888], &mut sink, CancellationToken::new())
        .await
        .expect("batch run");

    let rows = CsvSink::read_back(&csv_path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], report.records[0]);
    assert_eq!(rows[0].id, 42888);
    assert_eq!(rows[0].name, "pLKO.1 - TRC cloning vector");
}

#[tokio::test]
async fn cancelled_batch_produces_an_empty_report() {
    let server = MockServer::start().await;
    mount_full_plasmid(&server, 42888, "pLKO.1 - TRC cloning vector").await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let pipeline = HarvestPipeline::new(test_config(&server)).expect("pipeline");
    let mut sink = MemorySink::default();
    let report = pipeline
        .run(&[42888, 42889], &mut sink, cancel)
        .await
        .expect("batch run");

    assert!(report.records.is_empty());
    assert_eq!(report.summary.persisted, 0);
    assert!(sink.records.is_empty());
}

/// A sink that rejects everything, for persistence-failure plumbing.
#[derive(Default)]
struct RejectingSink;

#[async_trait]
impl PlasmidSink for RejectingSink {
    async fn persist(&mut self, _record: &Plasmid) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "disk is read-only",
        )))
    }
}

#[tokio::test]
async fn sink_failures_are_surfaced_not_swallowed() {
    let server = MockServer::start().await;
    mount_full_plasmid(&server, 42888, "pLKO.1 - TRC cloning vector").await;

    let pipeline = HarvestPipeline::new(test_config(&server)).expect("pipeline");
    let mut sink = RejectingSink;
    let report = pipeline
        .run(&[42888], &mut sink, CancellationToken::new())
        .await
        .expect("batch run");

    assert_eq!(report.summary.persisted, 0);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Persisted);
    assert!(report.failures[0].message.contains("read-only"));

    // The assembled record is still in the batch output.
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn unknown_vendor_yields_no_result() {
    let mut sink = MemorySink::default();
    let report = pharvest_ingest::harvest(
        "emolecules",
        AddgeneConfig::default(),
        &[1, 2, 3],
        &mut sink,
        CancellationToken::new(),
    )
    .await
    .expect("harvest");

    assert!(report.is_none());
    assert!(sink.records.is_empty());
}
