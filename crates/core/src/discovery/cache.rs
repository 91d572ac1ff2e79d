use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::discovery::DiscoveredFeed;

/// Discovery results keyed by resolved site URL, each valid for `ttl`.
///
/// Passed explicitly into discovery so callers own its lifetime; share one
/// instance across requests to avoid re-probing the same origin.
#[derive(Debug)]
pub struct DiscoveryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Vec<DiscoveredFeed>)>>,
}

impl DiscoveryCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached feeds for `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<Vec<DiscoveredFeed>> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored, feeds)) if stored.elapsed() < self.ttl => Some(feeds.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `feeds` under `key`, dropping any entries that have expired.
    pub fn insert(&self, key: &str, feeds: Vec<DiscoveredFeed>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
            entries.insert(key.to_string(), (Instant::now(), feeds));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedKind;

    fn feed(url: &str) -> DiscoveredFeed {
        DiscoveredFeed { url: url.to_string(), title: "T".to_string(), kind: FeedKind::Rss, site_url: None }
    }

    #[test]
    fn test_cache_hit() {
        let cache = DiscoveryCache::new(Duration::from_secs(60));
        cache.insert("https://example.com/", vec![feed("https://example.com/feed")]);

        let hit = cache.get("https://example.com/").unwrap();
        assert_eq!(hit[0].url, "https://example.com/feed");
        assert!(cache.get("https://other.com/").is_none());
    }

    #[test]
    fn test_cache_expiry() {
        let cache = DiscoveryCache::new(Duration::ZERO);
        cache.insert("k", vec![feed("https://example.com/feed")]);

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_drops_expired_entries() {
        let cache = DiscoveryCache::new(Duration::ZERO);
        for i in 0..1000 {
            cache.insert(&format!("https://site{i}.example.com/"), vec![feed("https://example.com/feed")]);
        }
        assert_eq!(cache.len(), 1);

        let cache = DiscoveryCache::new(Duration::from_secs(60));
        cache.insert("a", Vec::new());
        cache.insert("b", Vec::new());
        assert_eq!(cache.len(), 2);
    }
}
