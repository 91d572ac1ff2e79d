//! Feed discovery.
//!
//! [`discover_feeds`] turns a site name, bare domain or URL into a list of
//! validated feeds. Strategies run in layers:
//!
//! 1. classify the query and, for free text, resolve it to a site through a
//!    search results page or a `.com` guess confirmed with HEAD
//! 2. fetch the site; a feed content type that parses is returned directly
//! 3. scan the page for `<link rel="alternate">` feed tags
//! 4. probe common feed paths on the origin, concurrently
//! 5. re-fetch candidates with generic titles to backfill a real one,
//!    dropping those that fail
//!
//! Every probe and verification fails on its own; only an empty final list
//! is reported, as [`QuireError::NoFeedsFound`].

pub mod cache;
pub mod classify;
pub mod links;

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::feed::{FeedKind, ParsedFeed, parse_feed};
use crate::fetch::{FetchConfig, Fetcher};
use crate::{QuireError, Result};

pub use cache::DiscoveryCache;
pub use classify::{Query, classify_query, guess_domain, origin_of};
pub use links::{find_feed_links, first_search_result};

/// Paths probed on every resolved origin.
pub const COMMON_FEED_PATHS: &[&str] =
    &["/feed", "/rss", "/rss.xml", "/feed.xml", "/atom.xml", "/index.xml", "/blog/feed", "/blog/rss"];

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// A feed found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredFeed {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: FeedKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

impl DiscoveredFeed {
    fn from_parsed(url: &Url, feed: &ParsedFeed) -> Self {
        Self {
            url: url.to_string(),
            title: feed.title.clone().unwrap_or_default(),
            kind: feed.kind,
            site_url: feed.site_url.clone(),
        }
    }

    /// Whether the title says nothing beyond "this is a feed".
    pub fn has_generic_title(&self) -> bool {
        matches!(self.title.trim().to_ascii_lowercase().as_str(), "" | "rss" | "atom" | "feed")
    }
}

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub common_paths: Vec<String>,
    pub search_endpoint: String,
    pub cache_ttl: Duration,
    pub fetch: FetchConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            common_paths: COMMON_FEED_PATHS.iter().map(|p| p.to_string()).collect(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            cache_ttl: Duration::from_secs(15 * 60),
            fetch: FetchConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }
}

/// Builder for [`DiscoveryConfig`].
#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    pub fn common_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.common_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.search_endpoint = endpoint.into();
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.fetch.timeout = seconds;
        self
    }

    pub fn probe_timeout(mut self, seconds: u64) -> Self {
        self.config.fetch.probe_timeout = seconds;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.fetch.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> DiscoveryConfig {
        self.config
    }
}

/// A feed candidate and whether it has already been fetched and parsed.
#[derive(Debug)]
struct Candidate {
    feed: DiscoveredFeed,
    verified: bool,
}

/// Discovers the feeds for `query`.
///
/// # Errors
///
/// [`QuireError::SiteNotFound`] when free text resolves to no site and
/// [`QuireError::NoFeedsFound`] when every strategy comes back empty.
pub async fn discover_feeds(
    query: &str, fetcher: &dyn Fetcher, config: &DiscoveryConfig, cache: Option<&DiscoveryCache>,
) -> Result<Vec<DiscoveredFeed>> {
    let site = match classify_query(query) {
        Query::Url(url) => url,
        Query::Text(text) => resolve_site(&text, fetcher, config).await?,
    };
    let cache_key = site.to_string();

    if let Some(feeds) = cache.and_then(|c| c.get(&cache_key)) {
        tracing::debug!(site = %site, "discovery cache hit");
        return Ok(feeds);
    }

    let feeds = discover_at(&site, fetcher, config).await?;
    if let Some(cache) = cache {
        cache.insert(&cache_key, feeds.clone());
    }
    Ok(feeds)
}

async fn discover_at(site: &Url, fetcher: &dyn Fetcher, config: &DiscoveryConfig) -> Result<Vec<DiscoveredFeed>> {
    let mut page_url = site.clone();
    let mut html = None;

    match fetcher.get(site, config.fetch.page_timeout()).await {
        Ok(response) if response.is_success() => {
            page_url = response.url.clone();
            let text = response.text();

            if response.is_feed_content_type() {
                match parse_feed(&text) {
                    Ok(feed) => {
                        tracing::debug!(url = %page_url, "site URL is itself a feed");
                        return Ok(vec![DiscoveredFeed::from_parsed(&page_url, &feed)]);
                    }
                    Err(e) => tracing::debug!(url = %page_url, error = %e, "feed content type did not parse"),
                }
            }
            html = Some(text);
        }
        Ok(response) => tracing::debug!(url = %site, status = response.status, "site fetch returned non-success"),
        Err(e) => tracing::debug!(url = %site, error = %e, "site fetch failed, probing anyway"),
    }

    let origin = origin_of(&page_url);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for feed in html.as_deref().map(|h| find_feed_links(h, &origin)).unwrap_or_default() {
        if seen.insert(feed.url.clone()) {
            candidates.push(Candidate { feed, verified: false });
        }
    }

    for feed in probe_common_paths(&origin, fetcher, config).await {
        if seen.insert(feed.url.clone()) {
            candidates.push(Candidate { feed, verified: true });
        }
    }

    let feeds = backfill_titles(candidates, fetcher, config).await;

    let mut seen = HashSet::new();
    let feeds: Vec<DiscoveredFeed> = feeds.into_iter().filter(|f| seen.insert(f.url.clone())).collect();

    if feeds.is_empty() {
        return Err(QuireError::NoFeedsFound(origin.to_string()));
    }
    tracing::info!(site = %origin, count = feeds.len(), "discovered feeds");
    Ok(feeds)
}

/// Resolves a free-text query to a site URL.
async fn resolve_site(query: &str, fetcher: &dyn Fetcher, config: &DiscoveryConfig) -> Result<Url> {
    match search(query, fetcher, config).await {
        Some(url) => return Ok(url),
        None => tracing::debug!(query, "search found no site, guessing a domain"),
    }

    if let Some(guess) = guess_domain(query) {
        match fetcher.head(&guess, config.fetch.probe_timeout()).await {
            Ok(200 | 405) => return Ok(guess),
            Ok(status) => tracing::debug!(url = %guess, status, "domain guess rejected"),
            Err(e) => tracing::debug!(url = %guess, error = %e, "domain guess unreachable"),
        }
    }

    Err(QuireError::SiteNotFound(query.to_string()))
}

async fn search(query: &str, fetcher: &dyn Fetcher, config: &DiscoveryConfig) -> Option<Url> {
    let terms = format!("{query} rss feed");
    let url = Url::parse_with_params(&config.search_endpoint, &[("q", terms.as_str())]).ok()?;

    match fetcher.get(&url, config.fetch.page_timeout()).await {
        Ok(response) if response.is_success() => first_search_result(&response.text()),
        Ok(response) => {
            tracing::debug!(status = response.status, "search returned non-success");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "search request failed");
            None
        }
    }
}

/// Fetches and parses `url`, returning `None` on any failure.
async fn fetch_feed(url: &Url, fetcher: &dyn Fetcher, timeout: Duration) -> Option<ParsedFeed> {
    let response = match fetcher.get(url, timeout).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            tracing::debug!(%url, status = response.status, "candidate returned non-success");
            return None;
        }
        Err(e) => {
            tracing::debug!(%url, error = %e, "candidate fetch failed");
            return None;
        }
    };

    match parse_feed(&response.text()) {
        Ok(feed) => Some(feed),
        Err(e) => {
            tracing::debug!(%url, error = %e, "candidate is not a feed");
            None
        }
    }
}

async fn probe_common_paths(origin: &Url, fetcher: &dyn Fetcher, config: &DiscoveryConfig) -> Vec<DiscoveredFeed> {
    let urls: Vec<Url> = config.common_paths.iter().filter_map(|path| origin.join(path).ok()).collect();
    let timeout = config.fetch.probe_timeout();

    let probes = urls.iter().map(|url| async move {
        fetch_feed(url, fetcher, timeout)
            .await
            .map(|feed| DiscoveredFeed::from_parsed(url, &feed))
    });

    join_all(probes).await.into_iter().flatten().collect()
}

/// Re-fetches unverified candidates with generic titles and fills in their
/// title and site URL. Candidates that fail are dropped. Order is kept.
async fn backfill_titles(
    candidates: Vec<Candidate>, fetcher: &dyn Fetcher, config: &DiscoveryConfig,
) -> Vec<DiscoveredFeed> {
    let timeout = config.fetch.page_timeout();

    let checks = candidates.into_iter().map(|candidate| async move {
        if candidate.verified || !candidate.feed.has_generic_title() {
            return Some(candidate.feed);
        }

        let mut feed = candidate.feed;
        let url = Url::parse(&feed.url).ok()?;
        let parsed = fetch_feed(&url, fetcher, timeout).await?;

        if let Some(title) = parsed.title.filter(|t| !t.trim().is_empty()) {
            feed.title = title;
        }
        if parsed.site_url.is_some() {
            feed.site_url = parsed.site_url;
        }
        feed.kind = parsed.kind;
        Some(feed)
    });

    join_all(checks).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;

    const RSS: &str = r#"<rss version="2.0"><channel><title>Example Feed</title><link>https://example.com/</link>
        <item><title>One</title><link>https://example.com/1</link></item></channel></rss>"#;

    const ATOM: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>Atom Feed</title>
        <link href="https://example.com/"/></feed>"#;

    fn page_with_links(links: &str) -> String {
        format!("<html><head><title>Example</title>{links}</head><body>Hi</body></html>")
    }

    #[tokio::test]
    async fn test_bare_domain_normalized_before_fetch() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://theverge.com/",
                "text/html",
                page_with_links(r#"<link rel="alternate" type="application/rss+xml" href="/rss/index.xml">"#),
            )
            .with_page("https://theverge.com/rss/index.xml", "application/rss+xml", RSS);

        let feeds = discover_feeds("theverge.com", &fetcher, &DiscoveryConfig::default(), None).await.unwrap();

        assert_eq!(fetcher.requests()[0], "https://theverge.com/");
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://theverge.com/rss/index.xml");
        assert_eq!(feeds[0].title, "Example Feed");
    }

    #[tokio::test]
    async fn test_link_and_probe_deduplicated() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://example.com/",
                "text/html",
                page_with_links(r#"<link rel="alternate" type="application/rss+xml" title="Main" href="/feed">"#),
            )
            .with_page("https://example.com/feed", "application/rss+xml", RSS)
            .with_page("https://example.com/atom.xml", "application/atom+xml", ATOM);

        let feeds = discover_feeds("https://example.com", &fetcher, &DiscoveryConfig::default(), None).await.unwrap();

        let urls: Vec<&str> = feeds.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/feed", "https://example.com/atom.xml"]);
        assert_eq!(feeds[0].title, "Main");
        assert_eq!(feeds[1].kind, FeedKind::Atom);
    }

    #[tokio::test]
    async fn test_feed_url_returned_directly() {
        let fetcher = StaticFetcher::new().with_page("https://example.com/feed.xml", "application/rss+xml", RSS);

        let feeds = discover_feeds("https://example.com/feed.xml", &fetcher, &DiscoveryConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].title, "Example Feed");
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_generic_title_backfilled_or_dropped() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://example.com/",
                "text/html",
                page_with_links(concat!(
                    r#"<link rel="alternate" type="application/rss+xml" title="RSS" href="/good.xml">"#,
                    r#"<link rel="alternate" type="application/rss+xml" title="Feed" href="/broken.xml">"#,
                )),
            )
            .with_page("https://example.com/good.xml", "application/rss+xml", RSS)
            .with_page("https://example.com/broken.xml", "text/html", "<html>not a feed</html>");

        let feeds = discover_feeds("example.com", &fetcher, &DiscoveryConfig::default(), None).await.unwrap();

        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/good.xml");
        assert_eq!(feeds[0].title, "Example Feed");
        assert_eq!(feeds[0].site_url.as_deref(), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn test_probe_failures_isolated() {
        let fetcher = StaticFetcher::new()
            .with_status("https://example.com/", 500)
            .with_timeout("https://example.com/feed")
            .with_timeout("https://example.com/rss")
            .with_page("https://example.com/index.xml", "application/xml", RSS);

        let feeds = discover_feeds("example.com", &fetcher, &DiscoveryConfig::default(), None).await.unwrap();

        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/index.xml");
    }

    #[tokio::test]
    async fn test_no_feeds_found() {
        let fetcher = StaticFetcher::new().with_page("https://example.com/", "text/html", page_with_links(""));

        let err = discover_feeds("example.com", &fetcher, &DiscoveryConfig::default(), None).await.unwrap_err();
        assert!(matches!(err, QuireError::NoFeedsFound(_)));
        assert!(err.is_user_facing());
    }

    #[tokio::test]
    async fn test_text_query_uses_search_result() {
        let config = DiscoveryConfig::builder().search_endpoint("https://search.test/html/").build();
        let results = r#"<div class="result"><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fblog.example.com%2F">Blog</a></div>"#;
        let fetcher = StaticFetcher::new()
            .with_page("https://search.test/html/?q=Example+Blog+rss+feed", "text/html", results)
            .with_page("https://blog.example.com/rss.xml", "application/rss+xml", RSS);

        let feeds = discover_feeds("Example Blog", &fetcher, &config, None).await.unwrap();
        assert_eq!(feeds[0].url, "https://blog.example.com/rss.xml");
    }

    #[tokio::test]
    async fn test_text_query_domain_guess() {
        let config = DiscoveryConfig::builder().search_endpoint("https://search.test/html/").build();
        let fetcher = StaticFetcher::new()
            .with_status("https://daringfireball.com/", 405)
            .with_page("https://daringfireball.com/index.xml", "text/xml", RSS);

        let feeds = discover_feeds("Daring Fireball", &fetcher, &config, None).await.unwrap();
        assert_eq!(feeds[0].url, "https://daringfireball.com/index.xml");
    }

    #[tokio::test]
    async fn test_text_query_site_not_found() {
        let config = DiscoveryConfig::builder().search_endpoint("https://search.test/html/").build();
        let fetcher = StaticFetcher::new();

        let err = discover_feeds("Nowhere Gazette", &fetcher, &config, None).await.unwrap_err();
        assert_eq!(err.to_string(), r#"Could not find a website for "Nowhere Gazette""#);
    }

    #[tokio::test]
    async fn test_cache_short_circuits_fetches() {
        let fetcher = StaticFetcher::new().with_page("https://example.com/feed", "application/rss+xml", RSS);
        let cache = DiscoveryCache::new(Duration::from_secs(60));
        let config = DiscoveryConfig::default();

        let first = discover_feeds("example.com", &fetcher, &config, Some(&cache)).await.unwrap();
        let requests_after_first = fetcher.requests().len();
        let second = discover_feeds("https://example.com", &fetcher, &config, Some(&cache)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.requests().len(), requests_after_first);
    }

    #[test]
    fn test_discovered_feed_json_shape() {
        let feed = DiscoveredFeed {
            url: "https://x.com/feed".to_string(),
            title: "X".to_string(),
            kind: FeedKind::Atom,
            site_url: Some("https://x.com/".to_string()),
        };
        let json = serde_json::to_value(&feed).unwrap();
        assert_eq!(json["type"], "atom");
        assert_eq!(json["siteUrl"], "https://x.com/");
    }

    #[test]
    fn test_builder() {
        let config = DiscoveryConfig::builder()
            .common_paths(["/feed"])
            .probe_timeout(2)
            .cache_ttl(Duration::from_secs(5))
            .build();
        assert_eq!(config.common_paths, vec!["/feed"]);
        assert_eq!(config.fetch.probe_timeout, 2);
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
    }
}
