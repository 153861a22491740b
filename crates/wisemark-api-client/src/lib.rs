//! Shared HTTP client for the Wise API.
//!
//! Every call carries the four identity pieces the vendor requires: a
//! namespace header, an API key header, a basic-auth pair, and the user
//! agent. Metadata calls use a short timeout; file transfers a long one.
//! Responses are returned as raw `serde_json::Value` because the envelope
//! shapes are not stable; callers run the structural scanner from
//! `wisemark-core` over them.

pub mod api;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use wisemark_core::WiseConfig;

/// Timeout for metadata calls.
const METADATA_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for large-file transfers (downloads and the raw upload PUT).
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(180);

/// Bounded retry policy shared by the upload handshake and file downloads.
pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// HTTP client for the Wise API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    namespace: String,
    api_key: String,
    basic_user: String,
    basic_pass: String,
    user_agent: String,
}

impl ApiClient {
    pub fn new(config: &WiseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            api_key: config.api_key.clone(),
            basic_user: config.basic_user.clone(),
            basic_pass: config.basic_pass.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("User-Agent", &self.user_agent)
            .header("x-wise-namespace", &self.namespace)
            .header("x-api-key", &self.api_key)
            .basic_auth(&self.basic_user, Some(&self.basic_pass))
    }

    async fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request to {} failed with status {}: {}",
                url,
                status,
                error_text
            ));
        }
        Ok(response)
    }

    /// GET returning the raw JSON document.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.get(&url));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;
        let response = Self::check_status(response, &url).await?;

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// POST a JSON body and return the raw JSON response.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url)).json(body);

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;
        let response = Self::check_status(response, &url).await?;

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// Stream a remote file to disk in chunks. The URL is either public or
    /// presigned, so no API auth headers are attached.
    pub async fn download_to_file(&self, url: &str, out_path: &Path) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let response = self
            .client
            .get(url)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;
        let mut response = Self::check_status(response, url).await?;

        let mut file = tokio::fs::File::create(out_path)
            .await
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read download stream")?
        {
            file.write_all(&chunk)
                .await
                .context("Failed to write downloaded chunk")?;
        }
        file.flush().await.context("Failed to flush download")?;
        Ok(())
    }

    /// Raw PUT of file bytes to a presigned write location.
    pub async fn put_bytes(&self, url: &str, bytes: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .put(url)
            .timeout(TRANSFER_TIMEOUT)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Failed to send bytes to {url}"))?;
        Self::check_status(response, url).await.map(|_| ())
    }
}

/// Run `op` up to `attempts` times with a fixed delay between tries,
/// returning the first success. The last error surfaces with the attempt
/// count attached; one unit's failure is the caller's to absorb.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < attempts {
                    tracing::warn!(attempt, attempts, error = format!("{e:#}"), "{label} failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(e.context(format!("{label} failed after {attempts} attempts"))),
        None => Err(anyhow::anyhow!("{label} was given zero attempts")),
    }
}

// Re-export domain response types for convenience.
pub use api::FileDescriptor;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test op", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(anyhow::anyhow!("transient failure {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("test op", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("always down")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn retry_first_try_short_circuits() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test op", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
