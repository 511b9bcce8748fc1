//! HTTP byte source and shared response checks.
//!
//! Status handling: 404 → [`SourceError::NotFound`], 429 →
//! [`SourceError::RateLimited`] with `Retry-After` parsing, any other
//! non-success → [`SourceError::Status`]. No request is ever retried here;
//! retry policy belongs to whoever drives the import.

use std::time::Duration;

use futures_util::stream::{StreamExt, TryStreamExt};

use crate::error::SourceError;
use crate::source::{ByteSource, ByteStream};

/// Connection settings for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Applied to connecting and to each body read, not the whole download.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("conduit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Sources served as `GET {base_url}/{source_id}`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidLocation`] for a non-HTTP base URL and
    /// [`SourceError::Http`] if the client cannot be built.
    pub fn new(base_url: &str, options: &HttpOptions) -> Result<Self, SourceError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let lower = base_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(SourceError::InvalidLocation(base_url));
        }
        let http = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .connect_timeout(options.timeout)
            .read_timeout(options.timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    /// Full URL for a source, percent-encoding each path segment.
    #[must_use]
    pub fn url_for(&self, source_id: &str) -> String {
        let path: Vec<_> = source_id
            .trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect();
        format!("{}/{}", self.base_url, path.join("/"))
    }
}

impl ByteSource for HttpSource {
    async fn open(&self, source_id: &str) -> Result<ByteStream, SourceError> {
        let url = self.url_for(source_id);
        tracing::debug!(%url, "opening http source");
        let resp = check_response(self.http.get(&url).send().await?, source_id).await?;
        let size_hint = resp.content_length();
        let chunks = resp.bytes_stream().map_err(SourceError::from).boxed();
        Ok(ByteStream::new(chunks, size_hint))
    }
}

/// Check an HTTP response for error statuses, returning it unchanged on success.
pub async fn check_response(
    resp: reqwest::Response,
    source_id: &str,
) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(source_id.to_string()));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited {
            source_id: source_id.to_string(),
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            source_id: source_id.to_string(),
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body("")
                .unwrap(),
        )
    }

    fn mock_response_with_retry_after(status: u16, value: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .header("Retry-After", value)
                .body("")
                .unwrap(),
        )
    }

    #[test]
    fn parse_retry_after_from_header() {
        let resp = mock_response_with_retry_after(429, "120");
        assert_eq!(parse_retry_after(&resp), 120);
    }

    #[test]
    fn parse_retry_after_non_numeric() {
        let resp = mock_response_with_retry_after(429, "not-a-number");
        assert_eq!(parse_retry_after(&resp), 60);
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found() {
        let err = check_response(mock_response(404), "missing.jsonl")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(ref id) if id == "missing.jsonl"));
    }

    #[tokio::test]
    async fn rate_limited_keeps_retry_after() {
        let resp = mock_response_with_retry_after(429, "30");
        let err = check_response(resp, "s").await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::RateLimited {
                retry_after_secs: 30,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn server_error_maps_to_status() {
        let err = check_response(mock_response(503), "s").await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn success_passes_through() {
        assert!(check_response(mock_response(200), "s").await.is_ok());
    }

    #[test]
    fn url_encodes_segments_but_keeps_slashes() {
        let source =
            HttpSource::new("https://data.example.com/shards/", &HttpOptions::default()).unwrap();
        assert_eq!(
            source.url_for("2024/part 1.jsonl"),
            "https://data.example.com/shards/2024/part%201.jsonl"
        );
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = HttpSource::new("ftp://example.com", &HttpOptions::default()).unwrap_err();
        assert!(matches!(err, SourceError::InvalidLocation(_)));
    }
}
