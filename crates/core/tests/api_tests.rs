//! Library API integration tests
use quire_core::*;
use url::Url;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

#[test]
fn test_extract_generic_article() {
    let html = read_fixture("article.html");
    let url = Url::parse("https://coastal.example.com/2024/tide-pools").unwrap();

    let article = extract_with_registry(&html, Some(&url), &ExtractorRegistry::builtin());

    assert_eq!(article.title.as_deref(), Some("Why Tide Pools Matter"));
    assert_eq!(article.author.as_deref(), Some("Mara Quinn"));
    assert_eq!(article.date_published.as_deref(), Some("2024-04-12T08:00:00Z"));
    assert_eq!(
        article.lead_image_url.as_deref(),
        Some("https://coastal.example.com/images/tidepool.jpg")
    );
    assert_eq!(article.domain, "coastal.example.com");

    assert!(article.content.contains("Twice a day"));
    assert!(article.content.contains(r#"href="https://coastal.example.com/guides/species""#));
    assert!(!article.content.contains("Share this story"));
    assert!(!article.content.contains("Kelp forests"));
    assert!(!article.content.contains("<p></p>"));
    assert!(article.word_count > 20);
}

#[test]
fn test_extract_hydrated_article() {
    let html = read_fixture("semafor.html");
    let url = Url::parse("https://www.semafor.com/article/05/01/2024/budget-talks").unwrap();

    let article = extract_with_registry(&html, Some(&url), &ExtractorRegistry::builtin());

    assert_eq!(article.title.as_deref(), Some(r#"Inside the "Quiet" Budget Talks"#));
    assert_eq!(article.author.as_deref(), Some("Ada Lovelace"));
    assert_eq!(article.date_published.as_deref(), Some("2024-05-01T10:00:00Z"));
    assert_eq!(article.lead_image_url.as_deref(), Some("https://img.semafor.com/lead.jpg"));

    assert!(article.content.contains("<p>Negotiators met behind closed doors.</p>"));
    assert!(article.content.contains(
        "https://cdn.sanity.io/images/q7xz2k/production/Tb9Ew8CXIwaY6R1-2000x1333.jpg"
    ));
    assert!(article.content.contains("<figcaption>The Capitol at dusk</figcaption>"));
    assert!(article.content.contains("<p>A deal is expected [soon].</p>"));
    assert!(!article.content.contains("ignored"));
    assert!(!article.content.contains("Loading"));
}

#[test]
fn test_alias_uses_same_extractor() {
    let html = read_fixture("semafor.html");
    let url = Url::parse("https://semafor.com/article/05/01/2024/budget-talks").unwrap();

    let article = extract_with_registry(&html, Some(&url), &ExtractorRegistry::builtin());
    assert_eq!(article.author.as_deref(), Some("Ada Lovelace"));
    assert_eq!(article.domain, "semafor.com");
}

#[test]
fn test_rule_file_extractor() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("coastal.txt"),
        "domain: coastal.example.com\ntitle: article h1\nauthor: meta[name=\"author\"] @content\ncontent: article\nclean: figure\n",
    )
    .unwrap();

    let registry = RegistryBuilder::new()
        .with_builtin()
        .with_rule_dir(dir.path())
        .unwrap()
        .build();
    let url = Url::parse("https://coastal.example.com/2024/tide-pools").unwrap();
    let article = extract_with_registry(&read_fixture("article.html"), Some(&url), &registry);

    assert_eq!(article.title.as_deref(), Some("Why Tide Pools Matter"));
    assert_eq!(article.author.as_deref(), Some("Mara Quinn"));
    assert_eq!(article.lead_image_url, None);
    assert!(!article.content.contains("<figure>"));
}

#[test]
fn test_parse_rss_fixture() {
    let feed = parse_feed(&read_fixture("rss.xml")).unwrap();

    assert_eq!(feed.kind, FeedKind::Rss);
    assert_eq!(feed.title.as_deref(), Some("Coastal Notes"));
    assert_eq!(feed.items.len(), 3);

    let first = &feed.items[0];
    assert_eq!(first.author.as_deref(), Some("Mara Quinn"));
    assert_eq!(
        first.image_url.as_deref(),
        Some("https://coastal.example.com/images/tidepool-thumb.jpg")
    );
    assert_eq!(
        first.content_snippet.as_deref(),
        Some("A short field guide to the life between the tides.")
    );

    let second = &feed.items[1];
    assert_eq!(second.guid, "https://coastal.example.com/2024/wrack-line");
    assert_eq!(second.image_url.as_deref(), Some("https://coastal.example.com/images/wrack.png"));
    assert_eq!(
        second.content_snippet.as_deref(),
        Some("What washes up tells you what lives offshore .")
    );

    let third = &feed.items[2];
    assert_eq!(third.guid, "kelp-2024");
    assert_eq!(third.content, None);
}

#[test]
fn test_parse_atom_fixture() {
    let feed = parse_feed(&read_fixture("atom.xml")).unwrap();

    assert_eq!(feed.kind, FeedKind::Atom);
    assert_eq!(feed.site_url.as_deref(), Some("https://x.com/"));

    assert_eq!(feed.items[0].guid, "https://x.com/a");
    assert_eq!(feed.items[0].author.as_deref(), Some("Ann Author"));
    assert_eq!(feed.items[1].guid, "tag:x.com,2024:b");
    assert_eq!(feed.items[1].link, "https://x.com/b");
    assert_eq!(feed.items[1].image_url.as_deref(), Some("https://x.com/b.jpg"));
    assert_eq!(feed.items[1].pub_date.map(|d| d.hour()), Some(9));
}

#[test]
fn test_latin1_feed_fixture() {
    let bytes = std::fs::read(get_fixture_path("latin1.xml")).unwrap();

    let (text, decoded_as) = decode_with_report(&bytes, None);
    assert_eq!(decoded_as, DecodedAs::Latin1);
    assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));

    let feed = parse_feed(&text).unwrap();
    assert_eq!(feed.title.as_deref(), Some("Le Café du Coin"));
    assert_eq!(feed.items[0].title, "Crème brûlée à la maison");
}

#[test]
fn test_parse_items_on_html_is_empty() {
    assert!(parse_items(&read_fixture("article.html")).is_empty());
}

#[test]
fn test_opml_fixture() {
    let outlines = parse_opml(&read_fixture("subscriptions.opml")).unwrap();

    assert_eq!(outlines.len(), 4);
    assert_eq!(outlines[0].folder.as_deref(), Some("Science"));
    assert_eq!(outlines[1].folder.as_deref(), Some("News"));
    assert_eq!(outlines[3].folder, None);
    assert_eq!(outlines[3].source.url, "https://x.com/feed.atom");
}

#[tokio::test]
async fn test_discover_then_sync() {
    let fetcher = StaticFetcher::new()
        .with_page("https://coastal.example.com/", "text/html", read_fixture("site.html"))
        .with_page("https://coastal.example.com/feed", "application/rss+xml", read_fixture("rss.xml"))
        .with_page("https://coastal.example.com/atom.xml", "application/atom+xml", read_fixture("atom.xml"))
        .with_page("https://coastal.example.com/rss.xml", "application/rss+xml", read_fixture("rss.xml"));

    let feeds = discover_feeds("coastal.example.com", &fetcher, &DiscoveryConfig::default(), None)
        .await
        .unwrap();

    let urls: Vec<&str> = feeds.iter().map(|f| f.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://coastal.example.com/feed",
            "https://coastal.example.com/atom.xml",
            "https://coastal.example.com/rss.xml",
        ]
    );
    assert_eq!(feeds[0].title, "Coastal Notes");
    assert_eq!(feeds[1].title, "Coastal Notes (Atom)");

    let items = parse_items(&read_fixture("rss.xml"));
    let store = MemoryStore::new();

    let first = sync_items(&store, "user-1", &feeds[0].url, &items).await;
    let second = sync_items(&store, "user-1", &feeds[0].url, &items).await;

    assert_eq!((first.added, first.existing), (3, 0));
    assert_eq!((second.added, second.existing), (0, 3));

    let counts = unread_counts(&store, "user-1").await.unwrap();
    assert_eq!(counts.get(&feeds[0].url), Some(&3));
}

#[tokio::test]
async fn test_fetch_and_extract_with_static_fetcher() {
    let fetcher = StaticFetcher::new().with_page(
        "https://coastal.example.com/2024/tide-pools",
        "text/html; charset=utf-8",
        read_fixture("article.html"),
    );
    let url = Url::parse("https://coastal.example.com/2024/tide-pools").unwrap();

    let article = fetch_and_extract(&url, &fetcher, &FetchConfig::default(), &ExtractorRegistry::builtin())
        .await
        .unwrap();
    assert_eq!(article.title.as_deref(), Some("Why Tide Pools Matter"));

    let missing = Url::parse("https://coastal.example.com/missing").unwrap();
    let err = fetch_and_extract(&missing, &fetcher, &FetchConfig::default(), &ExtractorRegistry::builtin())
        .await
        .unwrap_err();
    assert!(matches!(err, QuireError::HttpStatus { status: 404, .. }));
}

#[test]
fn test_article_json() {
    let html = read_fixture("article.html");
    let url = Url::parse("https://coastal.example.com/2024/tide-pools").unwrap();
    let article = extract_with_registry(&html, Some(&url), &ExtractorRegistry::builtin());

    let json = article.to_json();
    assert_eq!(json["title"], "Why Tide Pools Matter");
    assert_eq!(json["domain"], "coastal.example.com");
    assert!(json["wordCount"].as_u64().unwrap() > 0);
    assert!(article.reading_time() > 0.0);
}
