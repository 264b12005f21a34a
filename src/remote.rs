//! Remote cover hosts
//!
//! [`RemoteSource`] is the seam between the synchronization logic and the
//! network. [`HttpRemoteSource`] is the production implementation; tests swap in
//! fakes to script failures.

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::paths::partial_path;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Access to remote cover images
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Metadata-only request for the remote last-modified time
    ///
    /// Returns `Ok(None)` when the server does not declare one.
    async fn last_modified(&self, url: &str) -> Result<Option<DateTime<Utc>>>;

    /// Download the full body of `url` to `destination`, replacing any existing file
    ///
    /// Returns the number of bytes written.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// [`RemoteSource`] backed by `reqwest`
#[derive(Clone, Debug)]
pub struct HttpRemoteSource {
    client: reqwest::Client,
}

impl HttpRemoteSource {
    /// Build a client with the configured timeout and user agent
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn last_modified(&self, url: &str) -> Result<Option<DateTime<Utc>>> {
        let parsed = parse_url(url)?;

        let response = self
            .client
            .head(parsed)
            .send()
            .await
            .map_err(|e| Error::network(url, e))?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date))
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let parsed = parse_url(url)?;

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::network(url, e))?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Stream into a sibling file so a broken transfer never clobbers the cached original
        let partial = partial_path(destination);
        let written = match write_body(&mut response, &partial, url).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, destination).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(Error::Io(e));
        }

        debug!(url = %url, path = %destination.display(), bytes = written, "cover downloaded");
        Ok(written)
    }
}

async fn write_body(response: &mut reqwest::Response, partial: &Path, url: &str) -> Result<u64> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await.map_err(|e| Error::Download {
        url: url.to_string(),
        message: format!("Failed to read response body: {}", e),
    })? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn parse_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}

/// Parse an HTTP-date header value (`Wed, 21 Oct 2015 07:28:00 GMT`)
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
