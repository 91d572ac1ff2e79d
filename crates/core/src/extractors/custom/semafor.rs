use crate::extractors::rules::{ContentRule, ExtractionRuleSet, Transform};
use crate::hydration::{self, HydrationConfig};
use crate::parse::Document;

/// Article pages render client-side; the server HTML is mostly a shell with
/// the story in flight payloads and images on the Sanity CDN.
const HYDRATION: HydrationConfig = HydrationConfig {
    fast_selector: "article",
    min_text_len: 500,
    image_base: "https://cdn.sanity.io/images",
    project_id: None,
    dataset: "production",
};

pub(super) fn rules() -> ExtractionRuleSet {
    ExtractionRuleSet {
        domain: "www.semafor.com".to_string(),
        aliases: vec!["semafor.com".to_string()],
        title: vec![
            ".extracted-title".into(),
            ("meta[property='og:title']", "content").into(),
            "h1".into(),
        ],
        author: vec![".extracted-author".into(), ("meta[name='author']", "content").into()],
        date_published: vec![
            (".extracted-date", "datetime").into(),
            ("meta[property='article:published_time']", "content").into(),
        ],
        lead_image_url: vec![("meta[property='og:image']", "content").into()],
        excerpt: vec![("meta[property='og:description']", "content").into()],
        content: ContentRule {
            selectors: vec![".extracted-content".to_string(), "article".to_string()],
            clean: vec!["[class*='Newsletter']".to_string()],
            transforms: vec![Transform::Document(hydrate)],
            default_cleaner: true,
        },
    }
}

fn hydrate(doc: &Document) -> Option<String> {
    hydration::hydrate(doc, &HYDRATION).map(|article| article.to_marker_html())
}
