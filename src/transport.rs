//! HTTP transport for remote contact-card files.
//!
//! Default [`Transport`] implementation backed by `reqwest`. The freshness
//! probe is a HEAD request; the download streams the body to a temp file so
//! byte progress can be reported while the transfer is in flight.
//!
//! Some servers answer an unauthenticated request with a redirect to their
//! login page instead of a 401. When a source configures a login URL, a
//! final response URL landing there is treated as an authentication failure.
//!
//! # Errors
//!
//! Both operations fail on network errors, per-request timeout, non-success
//! status, and login redirects. All of them surface as that source's
//! terminal transport error; they never abort sibling sources.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use tracing::debug;
use uuid::Uuid;

use crate::freshness::FreshnessStamp;
use crate::models::{AuthMethod, Source};
use crate::traits::{DownloadProgress, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reqwest-backed transport with a per-request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn request(&self, method: Method, source: &Source) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, &source.connection.url)
            .timeout(self.timeout);
        if source.connection.auth == AuthMethod::Basic {
            if let Some(username) = &source.connection.username {
                builder = builder.basic_auth(username, source.connection.password.as_deref());
            }
        }
        builder
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn check_freshness(&self, source: &Source) -> Result<Option<FreshnessStamp>> {
        let response = self
            .request(Method::HEAD, source)
            .send()
            .await
            .with_context(|| format!("freshness check for '{}' failed", source.name))?;

        ensure_not_login_redirect(source, response.url())?;
        if !response.status().is_success() {
            bail!(
                "freshness check for '{}' failed (HTTP {})",
                source.name,
                response.status()
            );
        }

        Ok(FreshnessStamp::from_headers(&header_pairs(
            response.headers(),
        )))
    }

    async fn download(
        &self,
        source: &Source,
        on_progress: DownloadProgress<'_>,
    ) -> Result<PathBuf> {
        let mut response = self
            .request(Method::GET, source)
            .send()
            .await
            .with_context(|| format!("download for '{}' failed", source.name))?;

        ensure_not_login_redirect(source, response.url())?;
        if !response.status().is_success() {
            bail!(
                "download for '{}' failed (HTTP {})",
                source.name,
                response.status()
            );
        }

        let total = response.content_length();
        let path = std::env::temp_dir().join(format!("cardsync-{}.vcf", Uuid::new_v4()));
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let mut read: u64 = 0;
        on_progress(read, total);
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("download for '{}' interrupted", source.name))?
        {
            file.write_all(&chunk)
                .with_context(|| format!("failed to write {}", path.display()))?;
            read += chunk.len() as u64;
            on_progress(read, total);
        }

        debug!(source = %source.name, bytes = read, path = %path.display(), "download finished");
        Ok(path)
    }
}

/// Collect response headers into name/value pairs for stamp construction.
/// Headers with non-UTF-8 values are skipped.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn ensure_not_login_redirect(source: &Source, final_url: &Url) -> Result<()> {
    let Some(login_url) = &source.connection.login_url else {
        return Ok(());
    };
    if final_url.as_str().trim_end_matches('/') == login_url.trim_end_matches('/') {
        bail!(
            "'{}' redirected to the login page; credentials are likely invalid",
            source.name
        );
    }
    Ok(())
}
