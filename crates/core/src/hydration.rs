//! Article recovery from framework hydration payloads.
//!
//! Client-rendered pages ship their article as JSON inside inline scripts of
//! the shape `self.__next_f.push([1, "<escaped JSON>"])`. This module finds
//! those calls, unescapes the string argument, cuts the `"content":[...]`
//! array out of it with a bracket-balanced scan, decodes the typed blocks
//! and renders them to HTML. Title, author and date are picked up from the
//! same text with targeted patterns.
//!
//! The result is returned as marker elements (`.extracted-content`,
//! `.extracted-title`, `.extracted-author`, `.extracted-date`) for the
//! extraction engine to splice into the document, so site rule sets can list
//! them ahead of their ordinary selectors.
//!
//! Every step is best effort. A payload that fails anywhere contributes
//! nothing and the next one is tried.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::parse::Document;

static PUSH_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)push\(\s*\[\s*\d+\s*,\s*"((?:[^"\\]|\\.)*)"\s*\]\s*\)"#).expect("valid push-call regex")
});

static AUTHOR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"firstName"\s*:\s*"([^"]+)".{0,200}?"lastName"\s*:\s*"([^"]+)""#).expect("valid author regex")
});

static PUBLISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:publishedAt|datePublished|publishDate)"\s*:\s*"([^"]+)""#).expect("valid date regex")
});

static HEADLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""headline"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("valid headline regex"));

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""title"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("valid title regex"));

static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""projectId"\s*:\s*"([a-z0-9]+)""#).expect("valid project id regex"));

const CONTENT_KEY: &str = r#""content":"#;

/// Where image assets are served from and when to bother scanning.
#[derive(Debug, Clone)]
pub struct HydrationConfig {
    /// Selector checked first; if it already holds enough text, scripts are not scanned.
    pub fast_selector: &'static str,
    /// Minimum text length under `fast_selector` that skips the scan.
    pub min_text_len: usize,
    /// Image CDN root, e.g. `https://cdn.sanity.io/images`.
    pub image_base: &'static str,
    /// CDN project, used when the payload does not name one.
    pub project_id: Option<&'static str>,
    pub dataset: &'static str,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            fast_selector: "article",
            min_text_len: 500,
            image_base: "https://cdn.sanity.io/images",
            project_id: None,
            dataset: "production",
        }
    }
}

/// A decoded entry of the hydration `content` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "_type", rename_all = "lowercase")]
pub enum ContentBlock {
    Block {
        #[serde(default)]
        children: Vec<Span>,
    },
    Image {
        asset: AssetRef,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        alt: Option<String>,
    },
    Gallery {
        #[serde(default)]
        images: Vec<GalleryImage>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GalleryImage {
    pub asset: AssetRef,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// An asset reference `image-<id>-<dimensions>-<ext>` split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id: String,
    pub dimensions: String,
    pub extension: String,
}

impl ImageAsset {
    pub fn parse(reference: &str) -> Option<Self> {
        let rest = reference.strip_prefix("image-").unwrap_or(reference);
        let (rest, extension) = rest.rsplit_once('-')?;
        let (id, dimensions) = rest.rsplit_once('-')?;

        let valid_dims = dimensions
            .split_once('x')
            .is_some_and(|(w, h)| w.chars().all(|c| c.is_ascii_digit()) && h.chars().all(|c| c.is_ascii_digit()));
        if id.is_empty() || extension.is_empty() || !valid_dims {
            return None;
        }

        Some(Self { id: id.to_string(), dimensions: dimensions.to_string(), extension: extension.to_string() })
    }

    pub fn url(&self, image_base: &str, project_id: &str, dataset: &str) -> String {
        format!(
            "{}/{}/{}/{}-{}.{}",
            image_base.trim_end_matches('/'),
            project_id,
            dataset,
            self.id,
            self.dimensions,
            self.extension
        )
    }
}

/// What one or more payloads yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydratedArticle {
    pub content_html: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date_published: Option<String>,
}

impl HydratedArticle {
    fn is_empty(&self) -> bool {
        self.content_html.is_empty() && self.title.is_none() && self.author.is_none() && self.date_published.is_none()
    }

    /// Renders the marker elements the extraction engine appends to `<body>`.
    pub fn to_marker_html(&self) -> String {
        let mut html = String::new();
        if let Some(title) = &self.title {
            html.push_str(&format!(r#"<h1 class="extracted-title">{}</h1>"#, html_escape::encode_text(title)));
        }
        if let Some(author) = &self.author {
            html.push_str(&format!(
                r#"<span class="extracted-author">{}</span>"#,
                html_escape::encode_text(author)
            ));
        }
        if let Some(date) = &self.date_published {
            html.push_str(&format!(
                r#"<time class="extracted-date" datetime="{0}">{0}</time>"#,
                html_escape::encode_double_quoted_attribute(date)
            ));
        }
        if !self.content_html.is_empty() {
            html.push_str(&format!(r#"<div class="extracted-content">{}</div>"#, self.content_html));
        }
        html
    }
}

/// Scans the document's inline scripts and recovers the article.
///
/// Returns `None` when the fast selector already has enough text or when no
/// payload yielded anything.
pub fn hydrate(doc: &Document, config: &HydrationConfig) -> Option<HydratedArticle> {
    let existing = doc.text_len_of(config.fast_selector);
    if existing >= config.min_text_len {
        tracing::debug!(existing, "page already has content, skipping hydration scan");
        return None;
    }

    let mut article = HydratedArticle::default();

    for script in doc.inline_scripts() {
        for raw in find_push_payloads(&script) {
            let decoded = unescape_payload(raw);

            if let Some(html) = extract_content_array(&decoded).and_then(|array| render_blocks(array, &decoded, config))
            {
                article.content_html.push_str(&html);
            }

            if article.title.is_none() {
                article.title = find_title(&decoded);
            }
            if article.author.is_none() {
                article.author = find_author(&decoded);
            }
            if article.date_published.is_none() {
                article.date_published = PUBLISHED.captures(&decoded).map(|c| c[1].to_string());
            }
        }
    }

    if article.is_empty() { None } else { Some(article) }
}

/// Captures the quoted string argument of every `push([id, "..."])` call.
pub fn find_push_payloads(script: &str) -> Vec<&str> {
    PUSH_CALL
        .captures_iter(script)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Unescapes a captured string argument back into the JSON text it carries.
///
/// Tries a real JSON string decode first; on failure only `\"` and `\\`
/// are unescaped.
pub fn unescape_payload(raw: &str) -> String {
    match serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "payload is not a valid JSON string, unescaping manually");
            raw.replace("\\\"", "\"").replace("\\\\", "\\")
        }
    }
}

/// Cuts the array literal following `"content":` out of `text`.
///
/// The scan counts `[` and `]` without tracking string literals, so a
/// bracket inside a string value will throw the count off.
pub fn extract_content_array(text: &str) -> Option<&str> {
    let key = text.find(&format!("{}[", CONTENT_KEY))?;
    let start = key + CONTENT_KEY.len();

    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    tracing::debug!("content array never closed");
    None
}

/// Decodes a JSON array of blocks, skipping entries that do not fit any block shape.
pub fn parse_blocks(array: &str) -> Option<Vec<ContentBlock>> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(array) {
        Ok(values) => values,
        Err(e) => {
            tracing::debug!(error = %e, "content array is not valid JSON");
            return None;
        }
    };

    Some(
        values
            .into_iter()
            .filter_map(|value| serde_json::from_value::<ContentBlock>(value).ok())
            .filter(|block| *block != ContentBlock::Unknown)
            .collect(),
    )
}

/// Renders blocks to HTML. `source` is searched for a CDN project id.
fn render_blocks(array: &str, source: &str, config: &HydrationConfig) -> Option<String> {
    let blocks = parse_blocks(array)?;
    let project_id = PROJECT_ID
        .captures(source)
        .map(|c| c[1].to_string())
        .or_else(|| config.project_id.map(str::to_string));

    let html: String = blocks
        .iter()
        .map(|block| render_block(block, project_id.as_deref(), config))
        .collect();

    if html.is_empty() { None } else { Some(html) }
}

/// Renders one block to HTML.
pub fn render_block(block: &ContentBlock, project_id: Option<&str>, config: &HydrationConfig) -> String {
    match block {
        ContentBlock::Block { children } => {
            let text = children
                .iter()
                .map(|span| span.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() { String::new() } else { format!("<p>{}</p>", html_escape::encode_text(&text)) }
        }
        ContentBlock::Image { asset, caption, alt } => {
            render_figure(asset, caption.as_deref(), alt.as_deref(), project_id, config)
        }
        ContentBlock::Gallery { images } => images
            .iter()
            .map(|image| render_figure(&image.asset, image.caption.as_deref(), image.alt.as_deref(), project_id, config))
            .collect(),
        ContentBlock::Unknown => String::new(),
    }
}

fn render_figure(
    asset: &AssetRef, caption: Option<&str>, alt: Option<&str>, project_id: Option<&str>, config: &HydrationConfig,
) -> String {
    let Some(project_id) = project_id else {
        tracing::debug!(asset = %asset.reference, "no CDN project id, dropping image");
        return String::new();
    };
    let Some(image) = ImageAsset::parse(&asset.reference) else {
        tracing::debug!(asset = %asset.reference, "unrecognized asset reference");
        return String::new();
    };

    let src = image.url(config.image_base, project_id, config.dataset);
    let alt = alt.or(caption).unwrap_or_default();
    let mut html = format!(
        r#"<figure><img src="{}" alt="{}">"#,
        html_escape::encode_double_quoted_attribute(&src),
        html_escape::encode_double_quoted_attribute(alt)
    );
    if let Some(caption) = caption.filter(|c| !c.trim().is_empty()) {
        html.push_str(&format!("<figcaption>{}</figcaption>", html_escape::encode_text(caption)));
    }
    html.push_str("</figure>");
    html
}

fn find_author(text: &str) -> Option<String> {
    let caps = AUTHOR_NAME.captures(text)?;
    Some(format!("{} {}", caps[1].trim(), caps[2].trim()))
}

fn find_title(text: &str) -> Option<String> {
    let caps = HEADLINE.captures(text).or_else(|| TITLE.captures(text))?;
    let raw = &caps[1];
    Some(serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string()))
}
