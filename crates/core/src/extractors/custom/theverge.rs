use crate::extractors::rules::{ContentRule, ExtractionRuleSet, Transform};
use crate::parse::Element;

pub(super) fn rules() -> ExtractionRuleSet {
    ExtractionRuleSet {
        domain: "www.theverge.com".to_string(),
        aliases: vec!["theverge.com".to_string()],
        title: vec![("meta[property='og:title']", "content").into(), "h1".into()],
        author: vec![
            ("meta[name='parsely-author']", "content").into(),
            ("meta[name='author']", "content").into(),
            "a[href*='/authors/']".into(),
        ],
        date_published: vec![
            ("meta[property='article:published_time']", "content").into(),
            ("time[datetime]", "datetime").into(),
        ],
        lead_image_url: vec![("meta[property='og:image']", "content").into()],
        excerpt: vec![("meta[property='og:description']", "content").into()],
        content: ContentRule {
            selectors: vec![
                ".duet--article--article-body-component-container".to_string(),
                "article .c-entry-content".to_string(),
                "article".to_string(),
            ],
            clean: vec![
                ".duet--article--related-stories".to_string(),
                ".duet--ad--native-ad".to_string(),
                ".c-related-list".to_string(),
            ],
            transforms: vec![Transform::Element { selector: "noscript".to_string(), apply: unwrap_noscript_image }],
            default_cleaner: true,
        },
    }
}

/// Lazy-loaded images keep the real `<img>` in a `<noscript>` sibling.
fn unwrap_noscript_image(el: &Element<'_>) -> Option<String> {
    let inner = el.inner_html();
    if inner.trim_start().starts_with("<img") { Some(inner) } else { None }
}
