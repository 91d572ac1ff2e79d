//! HTML scanning for discovery: feed `<link>` tags and search result links.

use url::Url;

use crate::discovery::DiscoveredFeed;
use crate::feed::FeedKind;
use crate::parse::Document;

/// Collects `<link rel="alternate">` tags whose type names RSS or Atom.
///
/// `href` values are resolved against `origin`, so relative and
/// protocol-relative links come back absolute. Duplicates are dropped.
pub fn find_feed_links(html: &str, origin: &Url) -> Vec<DiscoveredFeed> {
    let Ok(doc) = Document::parse(html) else {
        return Vec::new();
    };
    let Ok(links) = doc.select("link[rel][type][href]") else {
        return Vec::new();
    };

    let mut feeds: Vec<DiscoveredFeed> = Vec::new();
    for link in links {
        let is_alternate = link
            .attr("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("alternate")));
        let kind = match link.attr("type").map(str::to_ascii_lowercase) {
            Some(t) if t.contains("atom") => FeedKind::Atom,
            Some(t) if t.contains("rss") => FeedKind::Rss,
            _ => continue,
        };
        if !is_alternate {
            continue;
        }

        let Some(href) = link.attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
            continue;
        };
        let url = match origin.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(href, error = %e, "skipping unresolvable feed link");
                continue;
            }
        };

        if feeds.iter().any(|f| f.url == url.as_str()) {
            continue;
        }
        feeds.push(DiscoveredFeed {
            url: url.to_string(),
            title: link.attr("title").map(str::trim).unwrap_or_default().to_string(),
            kind,
            site_url: Some(origin.to_string()),
        });
    }

    feeds
}

/// First organic result link from a DuckDuckGo HTML results page.
///
/// Result anchors point at a redirector carrying the target in its `uddg`
/// parameter; direct http(s) links are taken as they are.
pub fn first_search_result(html: &str) -> Option<Url> {
    let doc = Document::parse(html).ok()?;
    let anchors = doc.select(".result:not(.result--ad) a.result__a").ok()?;
    let redirector = Url::parse("https://duckduckgo.com/").ok()?;

    anchors.iter().find_map(|anchor| {
        let href = redirector.join(anchor.attr("href")?).ok()?;
        let decoded = href
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .and_then(|(_, value)| Url::parse(&value).ok());
        let target = decoded.unwrap_or(href);
        let is_redirector = target.host_str().is_some_and(|h| h.ends_with("duckduckgo.com"));
        (matches!(target.scheme(), "http" | "https") && !is_redirector).then_some(target)
    })
}
