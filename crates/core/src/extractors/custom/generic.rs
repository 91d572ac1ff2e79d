use crate::extractors::rules::{ContentRule, ExtractionRuleSet, FieldSelector};

/// Rule set used when no site extractor matches the hostname.
///
/// Leans on OpenGraph and Twitter card metadata, which most publishers
/// emit, and falls back to the page's own structure.
pub fn generic_rules() -> ExtractionRuleSet {
    ExtractionRuleSet {
        domain: String::new(),
        aliases: Vec::new(),
        title: vec![
            ("meta[property='og:title']", "content").into(),
            ("meta[name='twitter:title']", "content").into(),
            "article h1".into(),
            "h1".into(),
            "title".into(),
        ],
        author: vec![
            ("meta[name='author']", "content").into(),
            ("meta[property='article:author']", "content").into(),
            "[rel='author']".into(),
            ".byline".into(),
            ".author".into(),
        ],
        date_published: vec![
            ("meta[property='article:published_time']", "content").into(),
            ("meta[itemprop='datePublished']", "content").into(),
            ("time[datetime]", "datetime").into(),
        ],
        lead_image_url: vec![
            ("meta[property='og:image']", "content").into(),
            ("meta[name='twitter:image']", "content").into(),
            FieldSelector::attr("article img", "src"),
        ],
        excerpt: vec![
            ("meta[property='og:description']", "content").into(),
            ("meta[name='description']", "content").into(),
        ],
        content: ContentRule {
            selectors: vec![
                "article".to_string(),
                "[itemprop='articleBody']".to_string(),
                "main".to_string(),
                "[role='main']".to_string(),
                "body".to_string(),
            ],
            clean: vec![".share".to_string(), ".related".to_string(), ".newsletter".to_string()],
            ..Default::default()
        },
    }
}
