pub mod article;
pub mod cleaner;
pub mod decode;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod extractors;
pub mod feed;
pub mod fetch;
pub mod hydration;
pub mod opml;
pub mod parse;
pub mod sync;

pub use article::{ExtractedArticle, WORDS_PER_MINUTE, count_words, html_to_text};
pub use decode::{DecodedAs, decode_document, decode_with_report};
pub use discovery::{
    DiscoveredFeed, DiscoveryCache, DiscoveryConfig, DiscoveryConfigBuilder, Query, classify_query, discover_feeds,
};
pub use error::{QuireError, Result, StoreError};
pub use extract::{extract, extract_with_registry, fetch_and_extract};
pub use extractors::{ExtractionRuleSet, ExtractorRegistry, FieldSelector, RegistryBuilder, RuleFileParser};
pub use feed::{FeedItem, FeedKind, FeedSource, ParsedFeed, parse_feed, parse_feed_bytes, parse_items};
#[cfg(feature = "fetch")]
pub use fetch::{HttpFetcher, fetch_url};
pub use fetch::{FetchConfig, FetchResponse, Fetcher, StaticFetcher, fetch_file, fetch_stdin};
pub use opml::{OpmlOutline, parse_opml};
pub use parse::Document;
pub use sync::{ItemStore, MemoryStore, SyncResult, sync_items, unread_counts};
