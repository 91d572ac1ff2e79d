//! The extraction rule engine.
//!
//! [`extract`] evaluates an [`ExtractionRuleSet`] against a parsed document:
//!
//! 1. Content transforms run first. Each returns HTML that is spliced into a
//!    copy of the document, which is then re-parsed, so marker elements a
//!    transform synthesizes are visible to every field below.
//! 2. Each scalar field walks its selector chain in declared order and stops
//!    at the first non-empty value.
//! 3. Content takes the inner HTML of the first non-empty content selector,
//!    runs the default cleaner unless the rule set opts out, then removes the
//!    rule set's `clean` selectors.
//!
//! Nothing here fails: a field with no match stays empty.

use std::sync::LazyLock;

use url::Url;

use crate::article::{ExtractedArticle, count_html_words};
use crate::cleaner::{default_clean, remove_selectors};
use crate::extractors::custom::generic_rules;
use crate::extractors::registry::ExtractorRegistry;
use crate::extractors::rules::{ExtractionRuleSet, FieldSelector, Transform};
use crate::fetch::{FetchConfig, Fetcher};
use crate::parse::{Document, Element, collapse_whitespace};
use crate::{QuireError, Result};

static GENERIC: LazyLock<ExtractionRuleSet> = LazyLock::new(generic_rules);

/// Extracts an article from `doc` with `rules`.
///
/// Relative lead image URLs and content links are resolved against the
/// document's base URL when it has one.
pub fn extract(doc: &Document, rules: &ExtractionRuleSet) -> ExtractedArticle {
    let transformed = apply_transforms(doc, &rules.content.transforms);
    let doc = transformed.as_ref().unwrap_or(doc);
    let base_url = doc.base_url();

    let content = first_match_content(&rules.content.selectors, |css| inner_html_of(doc, css))
        .map(|html| {
            let html = if rules.content.default_cleaner { default_clean(&html, base_url) } else { html };
            remove_selectors(&html, &rules.content.clean)
        })
        .unwrap_or_default();

    let lead_image_url = first_match(&rules.lead_image_url, |sel| resolve_field(doc, sel)).map(|src| {
        base_url
            .and_then(|base| base.join(&src).ok())
            .map(|url| url.to_string())
            .unwrap_or(src)
    });

    let domain = base_url
        .and_then(Url::host_str)
        .map(str::to_string)
        .unwrap_or_else(|| rules.domain.clone());

    ExtractedArticle {
        title: first_match(&rules.title, |sel| resolve_field(doc, sel)),
        author: first_match(&rules.author, |sel| resolve_field(doc, sel)),
        date_published: first_match(&rules.date_published, |sel| resolve_field(doc, sel)),
        lead_image_url,
        excerpt: first_match(&rules.excerpt, |sel| resolve_field(doc, sel)),
        word_count: count_html_words(&content),
        content,
        domain,
    }
}

/// Parses `html` and extracts it with the rule set registered for the URL's
/// host, or the generic rule set when none is.
///
/// An empty document yields [`ExtractedArticle::empty`].
pub fn extract_with_registry(html: &str, url: Option<&Url>, registry: &ExtractorRegistry) -> ExtractedArticle {
    let domain = url.and_then(Url::host_str).unwrap_or_default();

    let doc = match Document::parse_with_url(html, url.cloned()) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(domain, error = %e, "document unusable, returning empty article");
            return ExtractedArticle::empty(domain);
        }
    };

    match url.and_then(|u| registry.for_url(u)) {
        Some(rules) => {
            tracing::debug!(domain = %rules.domain, "using site extractor");
            extract(&doc, &rules)
        }
        None => extract(&doc, &GENERIC),
    }
}

/// Fetches `url` and extracts the article from the response.
///
/// Transport failures and non-2xx responses are errors here; callers decide
/// whether an empty article is one too.
pub async fn fetch_and_extract(
    url: &Url, fetcher: &dyn Fetcher, config: &FetchConfig, registry: &ExtractorRegistry,
) -> Result<ExtractedArticle> {
    let response = fetcher.get(url, config.page_timeout()).await?;
    if !response.is_success() {
        return Err(QuireError::HttpStatus { status: response.status, url: url.to_string() });
    }

    let html = response.text();
    Ok(extract_with_registry(&html, Some(&response.url), registry))
}

/// Returns the first non-empty value produced by `resolve`, evaluating
/// selectors strictly in order and never past the winner.
pub fn first_match<'r, F>(selectors: &'r [FieldSelector], mut resolve: F) -> Option<String>
where
    F: FnMut(&'r FieldSelector) -> Option<String>,
{
    selectors
        .iter()
        .find_map(|sel| resolve(sel).filter(|value| !value.trim().is_empty()))
}

/// Content counterpart of [`first_match`] over plain CSS selectors.
pub fn first_match_content<F>(selectors: &[String], mut lookup: F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    selectors
        .iter()
        .find_map(|css| lookup(css).filter(|html| !html.trim().is_empty()))
}

/// Value of one field selector: the first matching element with non-empty
/// text (or attribute), whitespace-collapsed.
fn resolve_field(doc: &Document, selector: &FieldSelector) -> Option<String> {
    let elements = match doc.select(selector.css()) {
        Ok(elements) => elements,
        Err(e) => {
            tracing::debug!(selector = selector.css(), error = %e, "skipping invalid selector");
            return None;
        }
    };

    elements.iter().find_map(|el| {
        let value = match selector {
            FieldSelector::Text(_) => el.normalized_text(),
            FieldSelector::Attr(_, name) => collapse_whitespace(el.attr(name)?),
        };
        (!value.is_empty()).then_some(value)
    })
}

fn inner_html_of(doc: &Document, css: &str) -> Option<String> {
    match doc.select(css) {
        Ok(elements) => elements
            .iter()
            .map(|el| el.inner_html())
            .find(|html| !html.trim().is_empty()),
        Err(e) => {
            tracing::debug!(selector = css, error = %e, "skipping invalid content selector");
            None
        }
    }
}

/// Runs transforms in order, each seeing the previous one's output.
///
/// Returns `None` when no transform changed anything.
fn apply_transforms(doc: &Document, transforms: &[Transform]) -> Option<Document> {
    let mut current: Option<Document> = None;

    for transform in transforms {
        let source = current.as_ref().unwrap_or(doc);

        let updated = match transform {
            Transform::Document(apply) => apply(source).map(|fragment| append_to_body(&source.as_string(), &fragment)),
            Transform::Element { selector, apply } => replace_elements(source, selector, *apply),
        };

        if let Some(html) = updated {
            match Document::parse_with_url(&html, doc.base_url().cloned()) {
                Ok(next) => current = Some(next),
                Err(e) => tracing::debug!(error = %e, "transform produced an unusable document"),
            }
        }
    }

    current
}

fn replace_elements(
    doc: &Document, selector: &str, apply: fn(&Element<'_>) -> Option<String>,
) -> Option<String> {
    let elements = match doc.select(selector) {
        Ok(elements) => elements,
        Err(e) => {
            tracing::debug!(selector, error = %e, "skipping transform with invalid selector");
            return None;
        }
    };

    let mut html = doc.as_string();
    let mut changed = false;
    for el in &elements {
        if let Some(replacement) = apply(el) {
            let original = el.outer_html();
            if html.contains(&original) {
                html = html.replacen(&original, &replacement, 1);
                changed = true;
            }
        }
    }

    changed.then_some(html)
}

fn append_to_body(html: &str, fragment: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + fragment.len());
            out.push_str(&html[..pos]);
            out.push_str(fragment);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{fragment}"),
    }
}
