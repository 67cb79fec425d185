//! Bounded HTTP fetching for manifests and media fragments.
//!
//! Both fetch roles enforce a wall-clock timeout and a byte ceiling.
//! The ceiling is checked twice: once against the declared
//! Content-Length (cheap rejection before any body bytes move) and
//! again while streaming, so servers that lie about or omit the
//! header cannot push oversized payloads through.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::errors::{AnalysisError, AppResult};

const USER_AGENT: &str = concat!("stream-lens/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct BoundedHttpClient {
    client: Client,
    manifest_timeout: Duration,
    fragment_timeout: Duration,
    max_manifest_size: u64,
    max_fragment_size: u64,
}

impl BoundedHttpClient {
    pub fn new(config: &FetchConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AnalysisError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            manifest_timeout: config.manifest_timeout,
            fragment_timeout: config.fragment_timeout,
            max_manifest_size: config.max_manifest_size,
            max_fragment_size: config.max_fragment_size,
        })
    }

    /// Fetch a manifest document as text.
    pub async fn fetch_manifest(&self, url: &Url) -> AppResult<String> {
        let bytes = self
            .fetch_bounded(url, self.manifest_timeout, self.max_manifest_size)
            .await?;
        String::from_utf8(bytes).map_err(|_| {
            AnalysisError::malformed("manifest body is not valid UTF-8".to_string())
        })
    }

    /// Fetch a media fragment as raw bytes.
    pub async fn fetch_fragment(&self, url: &Url) -> AppResult<Vec<u8>> {
        self.fetch_bounded(url, self.fragment_timeout, self.max_fragment_size)
            .await
    }

    async fn fetch_bounded(
        &self,
        url: &Url,
        timeout: Duration,
        max_size: u64,
    ) -> AppResult<Vec<u8>> {
        debug!("Fetching {} (timeout {:?}, max {} bytes)", url, timeout, max_size);

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > max_size {
                return Err(AnalysisError::PayloadTooLarge {
                    size: declared,
                    max_size,
                });
            }
        }

        let mut body = Vec::new();
        let mut response = response;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_reqwest_error(url, timeout, e))?
        {
            if body.len() as u64 + chunk.len() as u64 > max_size {
                return Err(AnalysisError::PayloadTooLarge {
                    size: body.len() as u64 + chunk.len() as u64,
                    max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

fn classify_reqwest_error(url: &Url, timeout: Duration, error: reqwest::Error) -> AnalysisError {
    if error.is_timeout() {
        AnalysisError::FetchTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        AnalysisError::internal(format!("request to {url} failed: {error}"))
    }
}
