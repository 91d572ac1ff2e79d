use crate::extractors::rules::{ContentRule, ExtractionRuleSet};

pub(super) fn rules() -> ExtractionRuleSet {
    ExtractionRuleSet {
        domain: "arstechnica.com".to_string(),
        aliases: vec!["www.arstechnica.com".to_string()],
        title: vec!["article header h1".into(), ("meta[property='og:title']", "content").into()],
        author: vec!["article header a[rel='author']".into(), ("meta[name='author']", "content").into()],
        date_published: vec![
            ("time[datetime]", "datetime").into(),
            ("meta[property='article:published_time']", "content").into(),
        ],
        lead_image_url: vec![("meta[property='og:image']", "content").into()],
        excerpt: vec!["article header h2".into(), ("meta[name='description']", "content").into()],
        content: ContentRule {
            selectors: vec![".post-content".to_string(), "div[itemprop='articleBody']".to_string()],
            clean: vec![".ad_wrapper".to_string(), ".sidebar".to_string(), ".story-sidebar".to_string()],
            ..Default::default()
        },
    }
}
