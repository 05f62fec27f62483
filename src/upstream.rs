//! Upstream REST Client
//!
//! Thin JSON client for the backend that the gateway caches.

use reqwest::{header::AUTHORIZATION, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::UpstreamError;

/// GET-only client bound to one backend base URL.
///
/// Request URLs are always built by appending path segments to the base, so
/// a proxied path can never climb above it.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Parses `base_url` and binds it to `http`.
    ///
    /// Fails when the URL does not parse or cannot take a path (`mailto:`).
    pub fn new(http: reqwest::Client, base: &str) -> Result<Self, UpstreamError> {
        let mut base_url =
            Url::parse(base).map_err(|e| UpstreamError::InvalidBaseUrl(format!("{base}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidBaseUrl(base_url.to_string()));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);
        if let Ok(mut segments) = base_url.path_segments_mut() {
            segments.pop_if_empty();
        }

        Ok(Self { http, base_url })
    }

    /// Builds a client with the configured base URL and request timeout.
    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;
        Self::new(http, &config.upstream_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // == URL Building ==
    /// Appends decoded `segments` below the base URL and sets `query`.
    ///
    /// Each segment is percent-encoded on the way in, so `/`, `?` and `#`
    /// inside a segment stay part of that segment. Callers must reject `.`
    /// and `..` segments beforehand.
    pub fn url_for<S: AsRef<str>>(&self, segments: &[S], query: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.set_query(query.filter(|q| !q.is_empty()));
        url
    }

    // == Get JSON ==
    /// Fetches `url` and decodes the JSON body.
    ///
    /// Non-success statuses become [`UpstreamError::Status`] carrying the
    /// backend's `detail` message when it sends one.
    pub async fn get_json(&self, url: Url, authorization: Option<&str>) -> Result<Value, UpstreamError> {
        debug!(%url, "upstream request");

        let mut request = self.http.get(url);
        if let Some(auth) = authorization {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::Status {
            status: status.as_u16(),
            detail: error_detail(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
        })
    }
}

/// Extracts the `detail` message from an error body like `{"detail": "..."}`.
fn error_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}
