//! RSS and Atom feeds.

pub mod date;
pub mod model;
pub mod parser;

pub use date::parse_date;
pub use model::{FeedItem, FeedKind, FeedSource, ParsedFeed};
pub use parser::{parse_feed, parse_feed_bytes, parse_items};
