//! Async HTTP fetcher wrapping reqwest.
//!
//! Handles redirects, timeouts, retry on 5xx, and backoff on 429. Any status
//! still unsuccessful after retries is returned as an error.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use nobel_laureates::{FetchedPage, Fetcher, HarvestError, HarvestResult};

const MAX_RETRIES: u32 = 2;
const MAX_REDIRECTS: usize = 5;
const RETRY_BASE_MS: u64 = 500;

/// [`Fetcher`] backed by a real HTTP client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for servers that reject HTTP/2.
    h1_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_ms: u64, user_agent: &str) -> HarvestResult<Self> {
        let build = |http1_only: bool| {
            let mut builder = reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
                .user_agent(user_agent);
            if http1_only {
                builder = builder.http1_only();
            }
            builder.build().map_err(|e| HarvestError::Http {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })
        };

        Ok(Self {
            client: build(false)?,
            h1_client: build(true)?,
        })
    }

    /// GET `url`, falling back to HTTP/1.1 on protocol errors.
    async fn get(&self, url: &Url) -> HarvestResult<reqwest::Response> {
        let result = match self.get_with_retry(&self.client, url).await {
            Err(e) if is_protocol_error(&e) => {
                debug!("retrying {url} over HTTP/1.1: {e}");
                self.get_with_retry(&self.h1_client, url).await
            }
            other => other,
        };

        let resp = result.map_err(|e| HarvestError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }

    async fn get_with_retry(
        &self,
        client: &reqwest::Client,
        url: &Url,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut retries = 0u32;

        loop {
            match client.get(url.clone()).send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < MAX_RETRIES {
                        retries += 1;
                        debug!("{url} returned {status}, retry {retries}");
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < MAX_RETRIES {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        debug!("{url} rate limited, waiting {retry_after}s");
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    return Ok(r);
                }
                Err(e) => {
                    if retries < MAX_RETRIES && !e.is_builder() {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> HarvestResult<FetchedPage> {
        let resp = self.get(url).await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().clone();
        let body = resp.text().await.map_err(|e| HarvestError::Http {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })?;

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status,
            body,
        })
    }

    async fn fetch_bytes(&self, url: &Url) -> HarvestResult<Vec<u8>> {
        let resp = self.get(url).await?;
        let bytes = resp.bytes().await.map_err(|e| HarvestError::Http {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })?;
        Ok(bytes.to_vec())
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// Whether the failure came from the HTTP/2 layer. Only the source chain is
/// inspected; the top-level message embeds the request URL.
fn is_protocol_error(e: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("http2") || text.contains("protocol") || text.contains("connection closed")
        {
            return true;
        }
        source = cause.source();
    }
    false
}
