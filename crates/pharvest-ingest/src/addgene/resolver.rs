// Annotated-sequence file resolution

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::{AddgeneError, Result};
use crate::rate_limit::RateGate;
use crate::retry::RetryPolicy;

/// Download links carry this marker class on the sequences page.
const SEQUENCE_LINK_SELECTOR: &str = "a.genbank-file-download";

/// The file host rejects default client identification, so downloads go
/// out with a conventional browser User-Agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Inner attempt budget for retrieving the file.
const SEQUENCE_TRIES: u32 = 3;

/// Locates and downloads the annotated-sequence file referenced by a
/// sequences document.
///
/// A missing link, and a download that stays broken past the inner retry
/// budget, both resolve to absent: some identifiers (pooled libraries)
/// legitimately publish no single sequence file.
pub struct SequenceResolver {
    client: Client,
    link: Selector,
    gate: Arc<RateGate>,
    policy: RetryPolicy,
}

impl SequenceResolver {
    pub fn new(timeout: Duration, gate: Arc<RateGate>, policy: &RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        let link = Selector::parse(SEQUENCE_LINK_SELECTOR)
            .map_err(|e| AddgeneError::Parse(format!("bad selector: {}", e)))?;

        Ok(Self {
            client,
            link,
            gate,
            policy: policy.with_max_attempts(SEQUENCE_TRIES),
        })
    }

    /// Find the download reference in the sequences document. Re-querying
    /// an already-parsed document is deterministic, so a miss is final.
    pub fn locate(&self, doc: &Html) -> Option<String> {
        doc.select(&self.link)
            .find_map(|el| el.value().attr("href"))
            .map(str::to_string)
    }

    /// Download and decode the sequence file. Transport failures get the
    /// inner 3-try budget; exhaustion resolves to absent rather than
    /// failing the identifier.
    pub async fn download(&self, id: u32, href: &str) -> Option<String> {
        match self.policy.run(|| self.fetch_bytes(href)).await {
            Ok(bytes) => {
                debug!(id, bytes = bytes.len(), "sequence file downloaded");
                Some(clean_payload(&bytes))
            },
            Err(err) => {
                warn!(id, href, error = %err, "sequence download failed, treating as absent");
                None
            },
        }
    }

    async fn fetch_bytes(&self, href: &str) -> Result<Vec<u8>> {
        self.gate.acquire().await;

        let response = self.client.get(href).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AddgeneError::HttpStatus {
                status,
                url: href.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode raw bytes into text a sink can store: byte sequences that fail
/// decoding become U+FFFD, embedded NULs are dropped.
fn clean_payload(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\0', "")
}
