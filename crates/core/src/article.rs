//! The normalized article produced by one extraction call.
//!
//! [`ExtractedArticle`] is created fresh per call and never mutated by the
//! engine afterwards; callers persist a copy.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::parse::{Document, collapse_whitespace};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[\w'-]+\b").expect("valid word regex"));

/// Words per minute used for the reading-time estimate.
pub const WORDS_PER_MINUTE: f64 = 200.0;

/// Structured fields pulled out of one article page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date_published: Option<String>,
    pub lead_image_url: Option<String>,
    pub excerpt: Option<String>,
    /// Cleaned article body as HTML.
    pub content: String,
    /// Hostname the article was extracted for.
    pub domain: String,
    pub word_count: usize,
}

impl ExtractedArticle {
    /// An article with every field empty, returned for missing or unusable documents.
    pub fn empty(domain: impl Into<String>) -> Self {
        Self { domain: domain.into(), ..Default::default() }
    }

    /// Plain text version of the content.
    pub fn text_content(&self) -> String {
        html_to_text(&self.content)
    }

    /// Estimated reading time in minutes.
    pub fn reading_time(&self) -> f64 {
        self.word_count as f64 / WORDS_PER_MINUTE
    }

    /// Whether nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.date_published.is_none()
            && self.lead_image_url.is_none()
            && self.excerpt.is_none()
            && self.content.trim().is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Convert HTML to whitespace-collapsed plain text.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = scraper::Html::parse_fragment(html);
    let pieces: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&pieces.join(" "))
}

/// Count words in text.
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Word count of an HTML fragment's text.
pub fn count_html_words(html: &str) -> usize {
    count_words(&html_to_text(html))
}

impl Document {
    /// Text length of the first element matching `selector`, zero if none.
    pub fn text_len_of(&self, selector: &str) -> usize {
        self.select_first(selector)
            .ok()
            .flatten()
            .map(|el| el.normalized_text().chars().count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_article() {
        let article = ExtractedArticle::empty("example.com");
        assert!(article.is_empty());
        assert_eq!(article.domain, "example.com");
        assert_eq!(article.word_count, 0);
    }

    #[test]
    fn test_reading_time() {
        let article = ExtractedArticle { word_count: 400, ..Default::default() };
        assert!((article.reading_time() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(
            html_to_text("<p>Hello world</p><p>Second paragraph</p>"),
            "Hello world Second paragraph"
        );
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("hello world"), 2);
        assert_eq!(count_words("one"), 1);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("it's a well-known fact"), 4);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let article = ExtractedArticle {
            title: Some("T".to_string()),
            lead_image_url: Some("https://img".to_string()),
            ..Default::default()
        };
        let json = article.to_json();
        assert_eq!(json["leadImageUrl"], "https://img");
        assert_eq!(json["wordCount"], 0);
    }

    #[test]
    fn test_text_len_of() {
        let doc = Document::parse("<article><p>  four   chars </p></article>").unwrap();
        assert_eq!(doc.text_len_of("article p"), "four chars".len());
        assert_eq!(doc.text_len_of(".missing"), 0);
    }
}
