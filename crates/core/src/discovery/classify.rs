use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}(?::\d+)?(?:/\S*)?$").expect("valid domain regex")
});

/// How a discovery query is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A URL, either given with its scheme or a bare domain with `https://` prefixed.
    Url(Url),
    /// Anything else: a site name to search for.
    Text(String),
}

/// Classifies free-form discovery input.
pub fn classify_query(input: &str) -> Query {
    let input = input.trim();
    let lower = input.to_ascii_lowercase();

    if (lower.starts_with("http://") || lower.starts_with("https://"))
        && let Ok(url) = Url::parse(input)
    {
        return Query::Url(url);
    }

    if BARE_DOMAIN.is_match(input)
        && let Ok(url) = Url::parse(&format!("https://{input}"))
    {
        return Query::Url(url);
    }

    Query::Text(input.to_string())
}

/// Last-resort domain guess for a site name: its alphanumerics plus `.com`.
///
/// Returns `None` when nothing alphanumeric is left.
pub fn guess_domain(query: &str) -> Option<Url> {
    let name: String = query
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if name.is_empty() {
        return None;
    }
    Url::parse(&format!("https://{name}.com")).ok()
}

/// Origin of `url` (scheme, host and port) as a URL with an empty path.
pub fn origin_of(url: &Url) -> Url {
    Url::parse(&url.origin().ascii_serialization()).unwrap_or_else(|_| url.clone())
}
