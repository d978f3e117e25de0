// Addgene page fetcher

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{AddgeneConfig, AddgeneError, Result};
use crate::rate_limit::RateGate;

/// User agent for page retrievals.
const CLIENT_USER_AGENT: &str = concat!("pharvest/", env!("CARGO_PKG_VERSION"));

/// The markup describing one identifier: the detail page and, when the
/// identifier exists, its sequences sub-page.
#[derive(Debug, Clone)]
pub struct PageSet {
    /// Detail page markup. Present even for a missing identifier, since
    /// the vendor's not-found sentinel lives in the page body.
    pub detail: String,

    /// Sequences sub-page markup. `None` when the detail page already
    /// reported the identifier missing, or the sub-page itself is absent.
    pub sequences: Option<String>,
}

/// HTTP retrieval of the two documents for one identifier.
pub struct PageFetcher {
    client: Client,
    config: AddgeneConfig,
    gate: Arc<RateGate>,
}

impl PageFetcher {
    /// Create a fetcher with the shared outbound rate gate.
    pub fn new(config: AddgeneConfig, gate: Arc<RateGate>) -> Result<Self> {
        config.validate().map_err(AddgeneError::Config)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(CLIENT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            config,
            gate,
        })
    }

    /// Fetch the detail and sequences documents for one identifier.
    ///
    /// A 404 on the detail page is not a transport failure: the body
    /// carries the not-found sentinel, which the extractor turns into a
    /// skip. The sequences fetch is skipped in that case.
    pub async fn fetch_pages(&self, id: u32) -> Result<PageSet> {
        let detail_url = self.config.detail_url(id);
        let (status, detail) = self.get(&detail_url).await?;

        if status == StatusCode::NOT_FOUND {
            debug!(id, "detail page missing, skipping sequences fetch");
            return Ok(PageSet {
                detail,
                sequences: None,
            });
        }

        let sequences_url = self.config.sequences_url(id);
        let (status, body) = self.get(&sequences_url).await?;
        let sequences = if status == StatusCode::NOT_FOUND {
            None
        } else {
            Some(body)
        };

        Ok(PageSet { detail, sequences })
    }

    /// Rate-gated GET returning the body for 2xx and 404 responses; every
    /// other status is an error (5xx/429 transient, the rest not).
    async fn get(&self, url: &str) -> Result<(StatusCode, String)> {
        self.gate.acquire().await;
        debug!(url, "GET");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(AddgeneError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok((status, body))
    }
}
