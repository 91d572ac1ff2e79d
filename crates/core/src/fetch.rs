//! Content fetching from URLs, files, and stdin.
//!
//! Network access goes through the [`Fetcher`] trait so discovery and
//! extraction can run against [`HttpFetcher`] in production and an in-memory
//! [`StaticFetcher`] offline. Only `(status, content type, body)` are
//! consumed; bodies stay as bytes until [`FetchResponse::text`] runs them
//! through the encoding-resilient decoder.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::decode::{charset_from_content_type, decode_document};
use crate::{QuireError, Result};

/// HTTP client configuration for fetching pages and feeds.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for full page and feed fetches, in seconds.
    pub timeout: u64,
    /// Timeout for path probes and HEAD checks, in seconds.
    pub probe_timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 15,
            probe_timeout: 5,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl FetchConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }
}

/// What the core needs from an HTTP response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Final URL after redirects.
    pub url: Url,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded with the charset from the `Content-Type` header as a hint.
    pub fn text(&self) -> String {
        let declared = self.content_type.as_deref().and_then(charset_from_content_type);
        decode_document(&self.body, declared)
    }

    /// Whether the content type names XML, RSS or Atom.
    pub fn is_feed_content_type(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("xml") || ct.contains("rss") || ct.contains("atom")
        })
    }
}

/// Raw fetch transport.
///
/// Non-2xx responses are returned as `Ok` with their status; `Err` means the
/// request itself failed (timeout, DNS, connection).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse>;

    /// Issues a HEAD request and returns the status code.
    async fn head(&self, url: &Url, timeout: Duration) -> Result<u16>;
}

/// [`Fetcher`] backed by a shared `reqwest` client with browser-like headers.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/rss+xml,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(config.page_timeout())
            .build()
            .map_err(QuireError::HttpError)?;

        Ok(Self { client })
    }

    fn map_error(e: reqwest::Error, timeout: Duration) -> QuireError {
        if e.is_timeout() { QuireError::Timeout { timeout: timeout.as_secs() } } else { QuireError::HttpError(e) }
    }
}

#[cfg(feature = "fetch")]
#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(e, timeout))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| Self::map_error(e, timeout))?.to_vec();

        tracing::debug!(%url, status, bytes = body.len(), "fetched");
        Ok(FetchResponse { status, content_type, body, url: final_url })
    }

    async fn head(&self, url: &Url, timeout: Duration) -> Result<u16> {
        let response = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(e, timeout))?;
        Ok(response.status().as_u16())
    }
}

/// Fetches a URL once with a fresh [`HttpFetcher`].
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<FetchResponse> {
    let parsed_url = parse_http_url(url)?;
    let fetcher = HttpFetcher::new(config)?;
    let response = fetcher.get(&parsed_url, config.page_timeout()).await?;

    if !response.is_success() {
        return Err(QuireError::HttpStatus { status: response.status, url: url.to_string() });
    }
    Ok(response)
}

/// Parses `url`, requiring an http or https scheme.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| QuireError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(QuireError::InvalidUrl(format!("unsupported scheme {other}, expected http or https"))),
    }
}

/// Reads raw bytes from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<Vec<u8>> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(QuireError::FileNotFound(path_buf))
    } else {
        fs::read(&path_buf).map_err(QuireError::from)
    }
}

/// Reads raw bytes from standard input until EOF.
pub fn fetch_stdin() -> Result<Vec<u8>> {
    use std::io::{self, Read};

    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer).map_err(QuireError::from)?;

    Ok(buffer)
}

#[derive(Debug, Clone)]
struct StaticPage {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// In-memory [`Fetcher`] serving canned responses.
///
/// Unknown URLs answer 404. Every requested URL is recorded, in order, and
/// can be inspected with [`StaticFetcher::requests`].
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, StaticPage>,
    failing: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with status 200 at `url`.
    pub fn with_page(mut self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(
            normalize_key(url),
            StaticPage { status: 200, content_type: Some(content_type.to_string()), body: body.into() },
        );
        self
    }

    /// Answers `url` with `status` and an empty body.
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.pages
            .insert(normalize_key(url), StaticPage { status, content_type: None, body: Vec::new() });
        self
    }

    /// Fails requests for `url` with a transport timeout.
    pub fn with_timeout(mut self, url: &str) -> Self {
        self.failing.push(normalize_key(url));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn lookup(&self, url: &Url, timeout: Duration) -> Result<Option<&StaticPage>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let key = normalize_key(url.as_str());
        if self.failing.contains(&key) {
            return Err(QuireError::Timeout { timeout: timeout.as_secs() });
        }
        Ok(self.pages.get(&key))
    }
}

fn normalize_key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse> {
        let response = match self.lookup(url, timeout)? {
            Some(page) => FetchResponse {
                status: page.status,
                content_type: page.content_type.clone(),
                body: page.body.clone(),
                url: url.clone(),
            },
            None => FetchResponse { status: 404, content_type: None, body: Vec::new(), url: url.clone() },
        };
        Ok(response)
    }

    async fn head(&self, url: &Url, timeout: Duration) -> Result<u16> {
        Ok(self.lookup(url, timeout)?.map_or(404, |page| page.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 15);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://example.com").is_ok());
        assert!(matches!(parse_http_url("not-a-url"), Err(QuireError::InvalidUrl(_))));
        assert!(matches!(parse_http_url("ftp://example.com/feed"), Err(QuireError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(QuireError::FileNotFound(_))));
    }

    #[test]
    fn test_response_text_uses_header_charset() {
        let response = FetchResponse {
            status: 200,
            content_type: Some("text/html; charset=Shift_JIS".to_string()),
            body: vec![0x93, 0xfa, 0x96, 0x7b],
            url: Url::parse("https://example.jp").unwrap(),
        };
        assert_eq!(response.text(), "日本");
    }

    #[test]
    fn test_feed_content_type() {
        let mut response = FetchResponse {
            status: 200,
            content_type: Some("application/rss+xml; charset=utf-8".to_string()),
            body: Vec::new(),
            url: Url::parse("https://example.com/feed").unwrap(),
        };
        assert!(response.is_feed_content_type());

        response.content_type = Some("text/html".to_string());
        assert!(!response.is_feed_content_type());

        response.content_type = None;
        assert!(!response.is_feed_content_type());
    }

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticFetcher::new()
            .with_page("https://example.com/", "text/html", "<p>hi</p>")
            .with_status("https://example.com/gone", 410)
            .with_timeout("https://slow.example.com");
        let timeout = Duration::from_secs(1);

        let page = fetcher.get(&Url::parse("https://example.com").unwrap(), timeout).await.unwrap();
        assert_eq!(page.text(), "<p>hi</p>");

        let missing = fetcher.get(&Url::parse("https://example.com/nope").unwrap(), timeout).await.unwrap();
        assert_eq!(missing.status, 404);

        let head = fetcher.head(&Url::parse("https://example.com/gone").unwrap(), timeout).await.unwrap();
        assert_eq!(head, 410);

        let slow = fetcher.get(&Url::parse("https://slow.example.com").unwrap(), timeout).await;
        assert!(matches!(slow, Err(QuireError::Timeout { .. })));

        assert_eq!(fetcher.requests().len(), 4);
    }

    #[test]
    fn test_error_timeout_message() {
        let err = QuireError::Timeout { timeout: 5 };
        assert!(err.to_string().contains('5'));
    }
}
