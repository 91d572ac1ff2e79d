use owo_colors::OwoColorize;
use quire_core::{DiscoveredFeed, ExtractedArticle, OpmlOutline, ParsedFeed};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Quire".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Articles, feeds and subscriptions\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print a labelled detail line under a step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print how long a step took, colored by speed
pub fn print_timing(label: &str, duration: std::time::Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);

    if ms < 250.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 1000.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Plain-text rendering of an extracted article.
pub fn render_article(article: &ExtractedArticle) -> String {
    let mut out = String::new();

    if let Some(title) = &article.title {
        out.push_str(&format!("{}\n", title));
        out.push_str(&format!("{}\n", "=".repeat(title.chars().count())));
    }

    let byline: Vec<&str> = [article.author.as_deref(), article.date_published.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !byline.is_empty() {
        out.push_str(&format!("{}\n", byline.join(" | ")));
    }

    out.push_str(&format!(
        "{} | {} words | {:.0} min read\n\n",
        article.domain,
        article.word_count,
        article.reading_time().ceil()
    ));
    out.push_str(&article.text_content());
    out.push('\n');
    out
}

pub fn render_feed(feed: &ParsedFeed) -> String {
    let mut out = format!("{} ({})\n", feed.title.as_deref().unwrap_or("(untitled feed)"), feed.kind);
    if let Some(site) = &feed.site_url {
        out.push_str(&format!("{}\n", site));
    }
    out.push('\n');

    for item in &feed.items {
        let date = item
            .pub_date
            .map(|d| d.date().to_string())
            .unwrap_or_else(|| "----------".to_string());
        out.push_str(&format!("{}  {}\n", date, item.title));
        if !item.link.is_empty() {
            out.push_str(&format!("            {}\n", item.link));
        }
    }
    out
}

pub fn render_discovered(feeds: &[DiscoveredFeed]) -> String {
    feeds
        .iter()
        .map(|feed| format!("{:<5} {}  {}\n", feed.kind.as_str(), feed.url, feed.title))
        .collect()
}

pub fn render_outlines(outlines: &[OpmlOutline]) -> String {
    outlines
        .iter()
        .map(|outline| match &outline.folder {
            Some(folder) => format!("[{}] {}  {}\n", folder, outline.source.title, outline.source.url),
            None => format!("{}  {}\n", outline.source.title, outline.source.url),
        })
        .collect()
}
