// Addgene HTTP configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::rate_limit::DEFAULT_REQUESTS_PER_MINUTE;
use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_DELAY_SCALE, DEFAULT_MAX_ATTEMPTS};

/// Default worker pool size for batch runs.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration for Addgene harvesting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddgeneConfig {
    /// Base URL for plasmid pages
    pub base_url: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Attempt budget for network operations (first try included)
    pub max_attempts: u32,

    /// Backoff base delay in milliseconds
    pub retry_base_delay_ms: u64,

    /// Backoff per-log2 increment in milliseconds
    pub retry_delay_scale_ms: u64,

    /// Worker pool size for batch runs
    pub concurrency: usize,

    /// Outbound request budget shared by all workers
    pub requests_per_minute: u64,
}

impl Default for AddgeneConfig {
    fn default() -> Self {
        AddgeneConfig {
            base_url: "https://www.addgene.org/".to_string(),
            timeout_secs: 30,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            retry_delay_scale_ms: DEFAULT_DELAY_SCALE.as_millis() as u64,
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

impl AddgeneConfig {
    /// Create new config with builder pattern
    pub fn builder() -> AddgeneConfigBuilder {
        AddgeneConfigBuilder::default()
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let default = Self::default();

        AddgeneConfig {
            base_url: std::env::var("ADDGENE_BASE_URL").unwrap_or(default.base_url),
            timeout_secs: env_parse("ADDGENE_TIMEOUT_SECS", default.timeout_secs),
            max_attempts: env_parse("ADDGENE_MAX_ATTEMPTS", default.max_attempts),
            retry_base_delay_ms: env_parse(
                "ADDGENE_RETRY_BASE_DELAY_MS",
                default.retry_base_delay_ms,
            ),
            retry_delay_scale_ms: env_parse(
                "ADDGENE_RETRY_DELAY_SCALE_MS",
                default.retry_delay_scale_ms,
            ),
            concurrency: env_parse("ADDGENE_CONCURRENCY", default.concurrency),
            requests_per_minute: env_parse(
                "ADDGENE_REQUESTS_PER_MINUTE",
                default.requests_per_minute,
            ),
        }
    }

    /// URL of an identifier's detail page: `{base}/{id}/`
    pub fn detail_url(&self, id: u32) -> String {
        format!("{}/{}/", self.base_url.trim_end_matches('/'), id)
    }

    /// URL of an identifier's sequences sub-page: `{base}/{id}/sequences/`
    pub fn sequences_url(&self, id: u32) -> String {
        format!("{}/{}/sequences/", self.base_url.trim_end_matches('/'), id)
    }

    /// Retry policy for network operations, from the configured knobs.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_delay_scale_ms),
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base URL cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Configuration for tests: tiny backoff, small attempt budget, no
    /// effective rate limiting.
    pub fn test_config() -> Self {
        AddgeneConfig {
            max_attempts: 3,
            retry_base_delay_ms: 1,
            retry_delay_scale_ms: 1,
            requests_per_minute: 600_000,
            concurrency: 4,
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Builder for AddgeneConfig
#[derive(Debug, Default)]
pub struct AddgeneConfigBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    retry_delay_scale_ms: Option<u64>,
    concurrency: Option<usize>,
    requests_per_minute: Option<u64>,
}

impl AddgeneConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.retry_base_delay_ms = Some(ms);
        self
    }

    pub fn retry_delay_scale_ms(mut self, ms: u64) -> Self {
        self.retry_delay_scale_ms = Some(ms);
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn requests_per_minute(mut self, budget: u64) -> Self {
        self.requests_per_minute = Some(budget);
        self
    }

    pub fn build(self) -> AddgeneConfig {
        let default = AddgeneConfig::default();

        AddgeneConfig {
            base_url: self.base_url.unwrap_or(default.base_url),
            timeout_secs: self.timeout_secs.unwrap_or(default.timeout_secs),
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            retry_base_delay_ms: self
                .retry_base_delay_ms
                .unwrap_or(default.retry_base_delay_ms),
            retry_delay_scale_ms: self
                .retry_delay_scale_ms
                .unwrap_or(default.retry_delay_scale_ms),
            concurrency: self.concurrency.unwrap_or(default.concurrency),
            requests_per_minute: self
                .requests_per_minute
                .unwrap_or(default.requests_per_minute),
        }
    }
}
