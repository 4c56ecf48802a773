/*!
 * Fetcher backed by the MediaWiki query API.
 *
 * Requests the latest revision of `Template:` and `Module:` pages with
 * `formatversion=2`. Missing and invalid titles are reported as not found;
 * rate limiting, server errors and transport failures are retried with
 * exponential backoff before being reported as transient.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Semaphore;
use url::Url;

use crate::app_config::FetchConfig;
use crate::dependencies::DependencyName;
use crate::errors::FetchError;
use crate::fetchers::{FetchOutcome, Fetcher};

/// Query API response, `formatversion=2`
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<QueryPage>,
}

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    slots: Slots,
}

#[derive(Debug, Deserialize)]
struct Slots {
    main: MainSlot,
}

#[derive(Debug, Deserialize)]
struct MainSlot {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

/// HTTP fetcher for Wiktionary (or any MediaWiki) templates and modules
#[derive(Debug)]
pub struct WiktionaryFetcher {
    /// Endpoint, e.g. `https://en.wiktionary.org/w/api.php`
    api_url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Request timeout
    timeout: Duration,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Bounds concurrent requests
    permits: Arc<Semaphore>,
}

impl WiktionaryFetcher {
    /// Create a fetcher from the fetch configuration section
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let api_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.concurrent_requests)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_url,
            client,
            timeout,
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_ms,
            permits: Arc::new(Semaphore::new(config.concurrent_requests.max(1))),
        })
    }

    async fn request_once(&self, name: &DependencyName) -> Result<FetchOutcome, FetchError> {
        let title = name.page_title();
        let response = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("format", "json"),
                ("formatversion", "2"),
                ("titles", title.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimitExceeded(format!("{} answered 429", self.api_url)));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(FetchError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;
        parse_query_response(&body)
    }
}

/// Interpret a query API payload
fn parse_query_response(body: &str) -> Result<FetchOutcome, FetchError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| FetchError::ParseError(e.to_string()))?;

    if let Some(error) = response.error {
        let message = format!("{}: {}", error.code, error.info);
        return Err(match error.code.as_str() {
            "maxlag" | "ratelimited" => FetchError::RateLimitExceeded(message),
            _ => FetchError::ParseError(message),
        });
    }

    let page = response
        .query
        .and_then(|query| query.pages.into_iter().next())
        .ok_or_else(|| FetchError::ParseError("response has no pages".to_string()))?;

    if page.missing || page.invalid {
        return Ok(FetchOutcome::NotFound);
    }

    page.revisions
        .into_iter()
        .next()
        .and_then(|revision| revision.slots.main.content)
        .map(FetchOutcome::Found)
        .ok_or_else(|| FetchError::ParseError("page has no revision content".to_string()))
}

#[async_trait]
impl Fetcher for WiktionaryFetcher {
    async fn fetch(&self, name: &DependencyName) -> FetchOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return FetchOutcome::TransientError(e.to_string()),
        };

        let mut attempt = 0;
        loop {
            match self.request_once(name).await {
                Ok(outcome) => {
                    debug!("Fetched {} after {} attempt(s)", name, attempt + 1);
                    return outcome;
                }
                Err(e) if e.should_retry() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(16));
                    warn!(
                        "Fetching {} failed: {} - attempt {}/{}",
                        name,
                        e,
                        attempt,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    error!("Giving up on {} for now: {}", name, e);
                    return FetchOutcome::TransientError(e.to_string());
                }
            }
        }
    }
}
