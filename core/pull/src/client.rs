//! Release API client.
//!
//! Fetches release metadata and asset bytes, always going through a
//! [`ReleaseCache`] first. Requests are issued one at a time and are never
//! retried.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;

use crate::cache::{PayloadKey, ReleaseCache};
use crate::config::Settings;
use crate::errors::{PullError, Result};
use crate::release::{Asset, Release};

/// Media type requested from the release API.
const API_MEDIA_TYPE: &str = "application/vnd.github+json";

/// User-Agent header for HTTP requests.
const USER_AGENT: &str = concat!("usr-local-pull/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the release API.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl ReleaseClient {
    /// Creates a client for the API at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PullError::fetch_with_source("failed to create HTTP client", e))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Creates a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] if the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.api_url.clone(),
            settings.token.clone(),
            settings.http_timeout,
        )
    }

    /// Base URL of the release API.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Returns the latest release of `owner/repo`.
    ///
    /// A fresh cached release is returned without a request. Otherwise the
    /// release is fetched, stamped with the current time, validated and
    /// written to the cache.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] on network or cache failures and
    /// [`PullError::Validation`] if the response is not a usable release.
    pub async fn latest_release(
        &self,
        cache: &mut ReleaseCache,
        owner: &str,
        repo: &str,
    ) -> Result<Release> {
        if let Some(release) = cache.get_release(owner, repo)? {
            return Ok(release);
        }

        let url = format!("{}/repos/{owner}/{repo}/releases/latest", self.api_url);
        tracing::info!(app = repo, owner, "fetching latest release");

        let body = self.get(&url).await?;
        let raw: Value = serde_json::from_slice(&body)
            .map_err(|e| PullError::validation(format!("invalid JSON from {url}: {e}")))?;

        let release = Release::from_fetched(owner, repo, raw, cache.now())?;
        tracing::debug!(app = repo, version = %release.version, id = release.id, "fetched release");
        cache.put_release(release.clone())?;
        Ok(release)
    }

    /// Returns the bytes of `asset`, downloading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Fetch`] on network or cache failures.
    pub async fn asset_bytes(
        &self,
        cache: &mut ReleaseCache,
        release: &Release,
        asset: &Asset,
    ) -> Result<Vec<u8>> {
        let key = PayloadKey::Asset(asset.id);
        if let Some(data) = cache.get_payload(&release.owner, &release.repo, key)? {
            return Ok(data);
        }

        tracing::info!(app = %release.repo, asset = %asset.name, "downloading asset");
        let data = self.get(&asset.download_url).await?;
        cache.put_payload(&release.owner, &release.repo, key, data.clone())?;
        Ok(data)
    }

    /// Returns the source snapshot of `release`, downloading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::MissingAsset`] if the release has no tarball URL
    /// and [`PullError::Fetch`] on network or cache failures.
    pub async fn tarball_bytes(
        &self,
        cache: &mut ReleaseCache,
        release: &Release,
    ) -> Result<Vec<u8>> {
        let key = PayloadKey::Tarball(release.id);
        if let Some(data) = cache.get_payload(&release.owner, &release.repo, key)? {
            return Ok(data);
        }

        let url = release.tarball_url.as_deref().ok_or_else(|| {
            PullError::missing_asset(&release.repo, "source tarball", release.asset_names())
        })?;

        tracing::info!(app = %release.repo, "downloading source tarball");
        let data = self.get(url).await?;
        cache.put_payload(&release.owner, &release.repo, key, data.clone())?;
        Ok(data)
    }

    fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.api_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Issues a GET request and streams the body into memory.
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        check_url(url)?;

        let mut request = self.http.get(url).header(ACCEPT, API_MEDIA_TYPE);
        if let Some(token) = &self.token
            && self.is_api_url(url)
        {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PullError::fetch_with_source(format!("failed to connect to {url}"), e))?;

        if !response.status().is_success() {
            return Err(handle_http_error(response.status(), url));
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| PullError::fetch_with_source(format!("failed to read from {url}"), e))?;
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(PullError::fetch(format!("empty response from {url}")));
        }
        Ok(data)
    }
}

/// Rejects anything that is not an `http` or `https` URL.
fn check_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| PullError::fetch_with_source(format!("invalid URL {url}"), e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(PullError::fetch(format!(
            "refusing to fetch {url}: unsupported scheme '{scheme}'"
        ))),
    }
}

/// Handles HTTP errors with user-friendly messages.
fn handle_http_error(status: reqwest::StatusCode, url: &str) -> PullError {
    match status.as_u16() {
        403 | 429 => PullError::fetch(format!(
            "rate limited or forbidden ({status}): {url}; set GITHUB_TOKEN to authenticate"
        )),
        404 => PullError::fetch(format!("not found: {url}")),
        code if code >= 500 => PullError::fetch(format!("server error ({code}): {url}")),
        code => PullError::fetch(format!("HTTP error {code}: {url}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_url_accepts_http_and_https() {
        assert!(check_url("https://api.github.com/repos/o/r/releases/latest").is_ok());
        assert!(check_url("http://127.0.0.1:1234/download/a").is_ok());
    }

    #[test]
    fn check_url_rejects_other_schemes() {
        for url in ["file:///etc/passwd", "ftp://example.com/a.tar.gz", "not a url"] {
            let err = check_url(url).expect_err(url);
            assert!(matches!(err, PullError::Fetch { .. }), "{url}");
        }
    }

    #[test]
    fn handle_http_error_not_found() {
        let err = handle_http_error(reqwest::StatusCode::NOT_FOUND, "https://x/y");
        assert_eq!(err.to_string(), "fetch error: not found: https://x/y");
    }

    #[test]
    fn handle_http_error_server_error() {
        let err = handle_http_error(reqwest::StatusCode::BAD_GATEWAY, "https://x/y");
        assert_eq!(err.to_string(), "fetch error: server error (502): https://x/y");
    }

    #[test]
    fn handle_http_error_rate_limited_mentions_token() {
        let err = handle_http_error(reqwest::StatusCode::FORBIDDEN, "https://x/y");
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn handle_http_error_generic() {
        let err = handle_http_error(reqwest::StatusCode::IM_A_TEAPOT, "https://x/y");
        assert_eq!(err.to_string(), "fetch error: HTTP error 418: https://x/y");
    }

    #[test]
    fn token_scope_is_limited_to_api_host() {
        let client = ReleaseClient::new("http://127.0.0.1:1234", None, Duration::from_secs(1))
            .expect("Should build client");
        assert!(client.is_api_url("http://127.0.0.1:1234/repos/o/r/releases/latest"));
        assert!(!client.is_api_url("http://127.0.0.1:12345/download"));
        assert!(!client.is_api_url("https://objects.example.com/asset"));
    }

    #[test]
    fn api_url_is_normalized() {
        let client = ReleaseClient::new("http://localhost:9/", None, Duration::from_secs(1))
            .expect("Should build client");
        assert_eq!(client.api_url(), "http://localhost:9");
    }
}
