//! Parsed HTML documents.
//!
//! [`Document`] and [`Element`] wrap `scraper` for the extraction engine, the
//! hydration scan and feed-link discovery. Selector syntax errors surface as
//! [`QuireError::HtmlParseError`]; markup itself never fails to parse.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{QuireError, Result};

/// A parsed page, optionally tagged with the URL it came from.
///
/// ```rust
/// use quire_core::parse::Document;
///
/// let doc = Document::parse(r#"<p class="lede">One</p><p class="lede">Two</p>"#).unwrap();
/// assert_eq!(doc.select("p.lede").unwrap().len(), 2);
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// The HTML5 parser recovers from any markup, so an `Err` here only
    /// signals an empty input.
    pub fn parse(html: &str) -> Result<Self> {
        if html.trim().is_empty() {
            return Err(QuireError::HtmlParseError("empty document".to_string()));
        }
        Ok(Self { html: Html::parse_document(html), base_url: None })
    }

    /// Parses HTML and remembers the URL it was fetched from.
    pub fn parse_with_url(html: &str, base_url: Option<Url>) -> Result<Self> {
        let mut doc = Self::parse(html)?;
        doc.base_url = base_url;
        Ok(doc)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Serializes the whole document back to HTML.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// All elements matching a CSS selector, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'_>>> {
        let compiled = compile(selector)?;
        Ok(self.html.select(&compiled).map(Element::from).collect())
    }

    pub fn select_first(&self, selector: &str) -> Result<Option<Element<'_>>> {
        let compiled = compile(selector)?;
        Ok(self.html.select(&compiled).next().map(Element::from))
    }

    /// Returns the text of every inline `<script>` (no `src` attribute).
    pub fn inline_scripts(&self) -> Vec<String> {
        let Ok(scripts) = compile("script:not([src])") else {
            return Vec::new();
        };
        self.html
            .select(&scripts)
            .map(|el| el.text().collect::<String>())
            .filter(|text| !text.trim().is_empty())
            .collect()
    }
}

/// One matched element of a [`Document`].
#[derive(Clone, Debug)]
pub struct Element<'a> {
    node: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Element<'a> {
    fn from(node: ElementRef<'a>) -> Self {
        Self { node }
    }
}

impl<'a> Element<'a> {
    pub fn inner_html(&self) -> String {
        self.node.inner_html()
    }

    pub fn outer_html(&self) -> String {
        self.node.html()
    }

    /// Concatenated descendant text, whitespace untouched.
    pub fn text(&self) -> String {
        self.node.text().collect()
    }

    /// Descendant text with whitespace runs collapsed to one space.
    pub fn normalized_text(&self) -> String {
        collapse_whitespace(&self.text())
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.value().attr(name)
    }

    /// Descendants matching a CSS selector.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let compiled = compile(selector)?;
        Ok(self.node.select(&compiled).map(Element::from).collect())
    }
}

/// Collapses whitespace runs into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| QuireError::HtmlParseError(format!("invalid selector {selector:?}: {e}")))
}
