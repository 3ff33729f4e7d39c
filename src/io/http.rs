use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use super::{ResourceMetadata, Transport};
use anyhow::{Context, Result, anyhow, bail};

/// Tuning knobs for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransportOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts allowed for a request failing on timeout or connect errors
    pub max_retry: u32,
}

impl Default for HttpTransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retry: 10,
        }
    }
}

impl HttpTransportOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }
}

/// Transport issuing HEAD and ranged GET requests against a URL
pub struct HttpTransport {
    client: Client,
    url: String,
    max_retry: u32,
}

impl HttpTransport {
    /// Create a transport with default options
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_options(url, HttpTransportOptions::default())
    }

    pub fn with_options(url: impl Into<String>, options: HttpTransportOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            max_retry: options.max_retry.max(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a request, re-sending it whole on timeout or connect failures.
    ///
    /// Any other failure, or running out of attempts, is returned as is.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut retry_count = 0;

        loop {
            match build().send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(anyhow!(e).context("Max retries exceeded"));
                    }
                    log::warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count,
                        self.max_retry,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self) -> Result<ResourceMetadata> {
        let resp = self.send_with_retry(|| self.client.head(&self.url)).await?;

        if resp.status() != StatusCode::OK {
            bail!("HEAD request failed with status: {}", resp.status());
        }

        let headers = resp.headers();
        ResourceMetadata::from_headers(
            header_str(headers, CONTENT_LENGTH),
            header_str(headers, CONTENT_TYPE),
            header_str(headers, ACCEPT_RANGES),
        )
    }

    async fn fetch_range(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }

        let end = offset + length - 1;
        let range = format!("bytes={}-{}", offset, end);

        let resp = self
            .send_with_retry(|| self.client.get(&self.url).header(RANGE, &range))
            .await?;

        if resp.status() != StatusCode::PARTIAL_CONTENT {
            bail!("Range request {} failed with status: {}", range, resp.status());
        }

        let declared: u64 = header_str(resp.headers(), CONTENT_LENGTH)
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| anyhow!("Range response for {} has no Content-Length", range))?;

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of range {}", range))?;

        if bytes.len() as u64 != declared {
            bail!(
                "Incomplete range response for {}: declared {} bytes, received {}",
                range,
                declared,
                bytes.len()
            );
        }

        Ok(bytes.to_vec())
    }
}
