//! Single-pass RSS/Atom parser.
//!
//! The document is read with a `quick-xml` pull reader. Element names from
//! both dialects map onto one [`FeedItem`] shape as they are closed, so RSS
//! 2.0, RSS 1.0 (RDF) and Atom all go through the same loop.

use std::mem;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::article::html_to_text;
use crate::decode::decode_document;
use crate::feed::date::parse_date;
use crate::feed::model::{FeedItem, FeedKind, ParsedFeed};
use crate::{QuireError, Result};

/// Maximum length, in characters, of a synthesized content snippet.
pub const SNIPPET_LEN: usize = 300;

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid img regex"));

/// Image candidates in priority order. The first filled slot wins.
#[derive(Debug, Default)]
struct ImageSlots {
    thumbnail: Option<String>,
    media_typed: Option<String>,
    media_medium: Option<String>,
    enclosure: Option<String>,
}

impl ImageSlots {
    fn best(self) -> Option<String> {
        self.thumbnail.or(self.media_typed).or(self.media_medium).or(self.enclosure)
    }
}

#[derive(Debug, Default)]
struct ItemBuilder {
    guid: Option<String>,
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    author: Option<String>,
    content: Option<String>,
    description: Option<String>,
    images: ImageSlots,
}

impl ItemBuilder {
    fn finish(self) -> Option<FeedItem> {
        let content_html = self.content.or_else(|| self.description.clone());
        let mut content_snippet = self.description.as_deref().map(html_to_text).filter(|s| !s.is_empty());
        if content_snippet.is_none() {
            content_snippet = content_html
                .as_deref()
                .map(|html| truncate_chars(&html_to_text(html), SNIPPET_LEN))
                .filter(|s| !s.is_empty());
        }
        let content = content_html.or_else(|| content_snippet.clone());

        let image_url = self.images.best().or_else(|| {
            content
                .as_deref()
                .and_then(|html| IMG_SRC.captures(html))
                .map(|caps| caps[1].to_string())
        });

        let mut item = FeedItem {
            guid: self.guid.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            pub_date: self.published.or(self.updated).as_deref().and_then(parse_date),
            author: self.author,
            content,
            content_snippet,
            image_url,
        };

        if item.ensure_guid() {
            Some(item)
        } else {
            tracing::debug!("dropping feed item with no guid, link or title");
            None
        }
    }
}

/// Parses an RSS or Atom document.
///
/// Fails with [`QuireError::FeedParseError`] on malformed XML or when the
/// root element is neither `rss`, `rdf:RDF` nor `feed`.
pub fn parse_feed(text: &str) -> Result<ParsedFeed> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut kind: Option<FeedKind> = None;
    let mut feed_title: Option<String> = None;
    let mut site_url: Option<String> = None;
    let mut items = Vec::new();

    let mut stack: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut current: Option<ItemBuilder> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| QuireError::FeedParseError(format!("at byte {}: {}", reader.error_position(), e)))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = element_name(e);

                if kind.is_none() {
                    kind = Some(match name.as_str() {
                        "rss" | "rdf:RDF" => FeedKind::Rss,
                        "feed" => FeedKind::Atom,
                        other => {
                            return Err(QuireError::FeedParseError(format!("unexpected root element <{other}>")));
                        }
                    });
                }

                if name == "item" || name == "entry" {
                    current = Some(ItemBuilder::default());
                }

                let parent = stack.last().map(String::as_str);
                if !is_empty
                    && let Some(item) = current.as_mut()
                    && matches!(name.as_str(), "content" | "summary")
                    && attribute(e, "type").as_deref() == Some("xhtml")
                {
                    // Inline markup: keep the children as HTML rather than their text events.
                    let inner = reader
                        .read_text(e.name())
                        .map_err(|err| QuireError::FeedParseError(format!("at byte {}: {}", reader.error_position(), err)))?;
                    item_text(item, &name, parent, unwrap_xhtml_div(&inner));
                    text_buf.clear();
                    continue;
                }

                match current.as_mut() {
                    Some(item) => item_attributes(item, &name, e),
                    None if name == "link" && matches!(parent, Some("feed")) && site_url.is_none() => {
                        site_url = atom_alternate_href(e);
                    }
                    None => {}
                }

                text_buf.clear();
                if !is_empty {
                    stack.push(name);
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| html_escape::decode_html_entities(&String::from_utf8_lossy(&e)).into_owned());
                text_buf.push_str(&text);
            }
            Event::CData(e) => {
                text_buf.push_str(&String::from_utf8_lossy(&e));
            }
            Event::End(_) => {
                let Some(name) = stack.pop() else { continue };
                let text = mem::take(&mut text_buf).trim().to_string();
                let parent = stack.last().map(String::as_str);

                if name == "item" || name == "entry" {
                    if let Some(item) = current.take().and_then(ItemBuilder::finish) {
                        items.push(item);
                    }
                    continue;
                }

                match current.as_mut() {
                    Some(item) => item_text(item, &name, parent, text),
                    None => {
                        let at_feed_level = matches!(parent, Some("channel") | Some("feed"));
                        if at_feed_level && !text.is_empty() {
                            match name.as_str() {
                                "title" if feed_title.is_none() => feed_title = Some(text),
                                "link" if site_url.is_none() => site_url = Some(text),
                                _ => {}
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| QuireError::FeedParseError("document has no root element".to_string()))?;
    Ok(ParsedFeed { title: feed_title, site_url, kind, items })
}

/// Decodes raw bytes with the encoding fallback chain, then parses them.
pub fn parse_feed_bytes(bytes: &[u8], declared: Option<&str>) -> Result<ParsedFeed> {
    parse_feed(&decode_document(bytes, declared))
}

/// Items of a feed, or an empty list if the document does not parse.
pub fn parse_items(text: &str) -> Vec<FeedItem> {
    match parse_feed(text) {
        Ok(feed) => feed.items,
        Err(e) => {
            tracing::debug!(error = %e, "feed did not parse, returning no items");
            Vec::new()
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        (attr.key.as_ref() == key.as_bytes())
            .then(|| attr.unescape_value().ok().map(|v| v.trim().to_string()))
            .flatten()
    })
}

fn atom_alternate_href(e: &BytesStart<'_>) -> Option<String> {
    let rel = attribute(e, "rel");
    if rel.as_deref().is_none_or(|r| r == "alternate") { attribute(e, "href").filter(|h| !h.is_empty()) } else { None }
}

/// Attribute-carrying elements inside an item.
fn item_attributes(item: &mut ItemBuilder, name: &str, e: &BytesStart<'_>) {
    let is_image_type = || attribute(e, "type").is_some_and(|t| t.starts_with("image/"));

    match name {
        "link" => {
            if item.link.is_none() {
                item.link = atom_alternate_href(e);
            }
            let is_enclosure = attribute(e, "rel").as_deref() == Some("enclosure");
            if is_enclosure && is_image_type() && item.images.enclosure.is_none() {
                item.images.enclosure = attribute(e, "href");
            }
        }
        "media:thumbnail" if item.images.thumbnail.is_none() => {
            item.images.thumbnail = attribute(e, "url");
        }
        "media:content" => {
            if is_image_type() && item.images.media_typed.is_none() {
                item.images.media_typed = attribute(e, "url");
            } else if attribute(e, "medium").as_deref() == Some("image") && item.images.media_medium.is_none() {
                item.images.media_medium = attribute(e, "url");
            }
        }
        "enclosure" if is_image_type() && item.images.enclosure.is_none() => {
            item.images.enclosure = attribute(e, "url");
        }
        _ => {}
    }
}

/// Text-carrying elements inside an item, dispatched when they close.
fn item_text(item: &mut ItemBuilder, name: &str, parent: Option<&str>, text: String) {
    if text.is_empty() {
        return;
    }

    let slot = match (name, parent) {
        ("title", Some("item" | "entry")) => &mut item.title,
        // RSS link text; an Atom href already filled the slot.
        ("link", _) => &mut item.link,
        ("guid" | "id", _) => &mut item.guid,
        ("pubDate" | "published", _) => &mut item.published,
        ("updated" | "dc:date", _) => &mut item.updated,
        ("dc:creator", _) | ("name", Some("author")) => &mut item.author,
        ("author", _) => &mut item.author,
        ("content:encoded" | "content", _) => &mut item.content,
        ("description" | "summary", _) => &mut item.description,
        _ => return,
    };

    if slot.is_none() {
        *slot = Some(text);
    }
}

/// Atom wraps xhtml content in a single `<div>` that is not part of it.
fn unwrap_xhtml_div(inner: &str) -> String {
    let inner = inner.trim();
    if let Some(rest) = inner.strip_prefix("<div")
        && rest.starts_with(|c: char| c == '>' || c.is_whitespace())
        && let Some(open_end) = rest.find('>')
        && let Some(body) = rest[open_end + 1..].strip_suffix("</div>")
    {
        return body.trim().to_string();
    }
    inner.to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example News</title>
    <link>https://example.com/</link>
    <image><title>Logo</title><url>https://example.com/logo.png</url></image>
    <item>
      <title>First &amp; Foremost</title>
      <link>https://example.com/first</link>
      <guid isPermaLink="false">first-1</guid>
      <pubDate>Tue, 05 Mar 2024 14:30:00 +0000</pubDate>
      <dc:creator>Jane Doe</dc:creator>
      <description>&lt;p&gt;Short &lt;b&gt;summary&lt;/b&gt;&lt;/p&gt;</description>
      <content:encoded><![CDATA[<p>Full body <img src="https://example.com/inline.jpg"></p>]]></content:encoded>
      <enclosure url="https://example.com/enc.jpg" type="image/jpeg" length="1"/>
      <media:content url="https://example.com/medium.jpg" medium="image"/>
      <media:content url="https://example.com/typed.jpg" type="image/jpeg"/>
    </item>
    <item>
      <title>No guid here</title>
      <link>https://example.com/second</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <link rel="self" href="https://x.com/feed.atom"/>
  <link href="https://x.com/"/>
  <entry>
    <title>Entry A</title>
    <link rel="alternate" href="https://x.com/a"/>
    <updated>2024-03-06T10:00:00Z</updated>
    <published>2024-03-05T10:00:00Z</published>
    <author><name>Ann Author</name></author>
    <summary>Plain summary</summary>
  </entry>
  <entry>
    <title>Entry B</title>
    <id>tag:x.com,2024:b</id>
    <link rel="replies" href="https://x.com/b/comments"/>
    <link href="https://x.com/b"/>
    <content type="html">&lt;p&gt;Body B&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let feed = parse_feed(RSS).unwrap();

        assert_eq!(feed.kind, FeedKind::Rss);
        assert_eq!(feed.title.as_deref(), Some("Example News"));
        assert_eq!(feed.site_url.as_deref(), Some("https://example.com/"));
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.title, "First & Foremost");
        assert_eq!(first.guid, "first-1");
        assert_eq!(first.author.as_deref(), Some("Jane Doe"));
        assert_eq!(first.pub_date.map(|d| d.unix_timestamp()), Some(1709649000));
        assert_eq!(first.content.as_deref(), Some(r#"<p>Full body <img src="https://example.com/inline.jpg"></p>"#));
        assert_eq!(first.content_snippet.as_deref(), Some("Short summary"));
        assert_eq!(first.image_url.as_deref(), Some("https://example.com/typed.jpg"));
    }

    #[test]
    fn test_rss_guid_falls_back_to_link() {
        let feed = parse_feed(RSS).unwrap();
        assert_eq!(feed.items[1].guid, "https://example.com/second");
        assert_eq!(feed.items[1].content, None);
    }

    #[test]
    fn test_parse_atom() {
        let feed = parse_feed(ATOM).unwrap();

        assert_eq!(feed.kind, FeedKind::Atom);
        assert_eq!(feed.title.as_deref(), Some("Atom Example"));
        assert_eq!(feed.site_url.as_deref(), Some("https://x.com/"));

        let a = &feed.items[0];
        assert_eq!(a.guid, "https://x.com/a");
        assert_eq!(a.link, "https://x.com/a");
        assert_eq!(a.author.as_deref(), Some("Ann Author"));
        assert_eq!(a.pub_date.map(|d| d.day()), Some(5));
        assert_eq!(a.content.as_deref(), Some("Plain summary"));

        let b = &feed.items[1];
        assert_eq!(b.guid, "tag:x.com,2024:b");
        assert_eq!(b.link, "https://x.com/b");
        assert_eq!(b.content.as_deref(), Some("<p>Body B</p>"));
        assert_eq!(b.content_snippet.as_deref(), Some("Body B"));
    }

    #[test]
    fn test_atom_xhtml_content() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>urn:x:1</id>
    <title>Inline</title>
    <summary type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Short <em>take</em></div></summary>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Body text here</p></div></content>
    <updated>2024-03-06T10:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:x:2</id>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Only <b>content</b></p></div></content>
  </entry>
</feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.content.as_deref(), Some("<p>Body text here</p>"));
        assert_eq!(first.content_snippet.as_deref(), Some("Short take"));
        assert!(first.pub_date.is_some());

        let second = &feed.items[1];
        assert_eq!(second.content.as_deref(), Some("<p>Only <b>content</b></p>"));
        assert_eq!(second.content_snippet.as_deref(), Some("Only content"));
    }

    #[test]
    fn test_unwrap_xhtml_div() {
        assert_eq!(unwrap_xhtml_div(r#" <div xmlns="x"><p>a</p></div> "#), "<p>a</p>");
        assert_eq!(unwrap_xhtml_div("<divider>a</divider>"), "<divider>a</divider>");
        assert_eq!(unwrap_xhtml_div("plain"), "plain");
    }

    #[test]
    fn test_image_priority_chain() {
        let feed = |media: &str| {
            format!(
                r#"<rss xmlns:media="http://search.yahoo.com/mrss/"><channel><item><title>T</title>{media}</item></channel></rss>"#
            )
        };

        let items = parse_items(&feed(
            r#"<media:content url="m.jpg" medium="image"/><media:thumbnail url="thumb.jpg"/>"#,
        ));
        assert_eq!(items[0].image_url.as_deref(), Some("thumb.jpg"));

        let items = parse_items(&feed(
            r#"<enclosure url="e.jpg" type="image/png"/><media:content url="m.jpg" medium="image"/>"#,
        ));
        assert_eq!(items[0].image_url.as_deref(), Some("m.jpg"));

        let items = parse_items(&feed(
            r#"<enclosure url="audio.mp3" type="audio/mpeg"/><enclosure url="e.jpg" type="image/png"/>"#,
        ));
        assert_eq!(items[0].image_url.as_deref(), Some("e.jpg"));

        let items = parse_items(&feed(r#"<description>&lt;img src="inline.gif"&gt;</description>"#));
        assert_eq!(items[0].image_url.as_deref(), Some("inline.gif"));

        let items = parse_items(&feed("<description>No pictures</description>"));
        assert_eq!(items[0].image_url, None);
    }

    #[test]
    fn test_snippet_truncated_from_content() {
        let body = "word ".repeat(100);
        let xml = format!(
            r#"<rss xmlns:content="http://purl.org/rss/1.0/modules/content/"><channel><item><guid>g</guid><content:encoded><![CDATA[<p>{body}</p>]]></content:encoded></item></channel></rss>"#
        );
        let items = parse_items(&xml);
        assert_eq!(items[0].content_snippet.as_ref().map(|s| s.chars().count()), Some(SNIPPET_LEN));
    }

    #[test]
    fn test_rdf_feed() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
            <channel><title>RDF</title><link>https://r.org/</link></channel>
            <item><title>R1</title><link>https://r.org/1</link><dc:date>2024-01-02T03:04:05Z</dc:date></item>
        </rdf:RDF>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.kind, FeedKind::Rss);
        assert_eq!(feed.items[0].guid, "https://r.org/1");
        assert!(feed.items[0].pub_date.is_some());
    }

    #[test]
    fn test_not_a_feed() {
        assert!(matches!(parse_feed("<html><body>hi</body></html>"), Err(QuireError::FeedParseError(_))));
        assert!(matches!(parse_feed(""), Err(QuireError::FeedParseError(_))));
    }

    #[test]
    fn test_malformed_feed_yields_no_items() {
        let xml = "<rss><channel><item><title>Broken</item></channel></rss>";
        assert!(parse_feed(xml).is_err());
        assert!(parse_items(xml).is_empty());
    }

    #[test]
    fn test_latin1_bytes() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?><rss><channel><title>Caf"#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</title><item><title>Cr");
        bytes.push(0xE8);
        bytes.extend_from_slice(b"me</title></item></channel></rss>");

        let feed = parse_feed_bytes(&bytes, None).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Café"));
        assert_eq!(feed.items[0].title, "Crème");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
