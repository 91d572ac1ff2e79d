//! Content cleaning for extracted article bodies.
//!
//! Two passes live here: the generic boilerplate cleaner applied to every
//! rule set unless it opts out, and removal of the rule set's own `clean`
//! selectors. Both are streaming rewrites with `lol_html`; a rewrite error
//! leaves the input unchanged.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Tags the generic cleaner always drops, content included.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "form", "button", "input", "nav", "aside", "footer", "svg", "canvas",
];

/// Block tags dropped when they hold nothing but whitespace or `<br>`.
const EMPTY_CANDIDATES: &[&str] = &["div", "p", "span", "section", "header", "figure"];

const MAX_EMPTY_PASSES: usize = 10;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

static EMPTY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    EMPTY_CANDIDATES
        .iter()
        .map(|tag| {
            Regex::new(&format!(r#"<{tag}(?:\s[^>]*)?>\s*(?:<br\s*/?>\s*)*</{tag}>"#)).expect("valid empty-node regex")
        })
        .collect()
});

/// Generic boilerplate removal applied after content selection.
///
/// Drops scripts, navigation chrome, forms, comments and empty blocks, then
/// rewrites relative `href`/`src` values against `base_url` when given.
pub fn default_clean(html: &str, base_url: Option<&Url>) -> String {
    let mut cleaned = remove_selectors(html, BOILERPLATE_TAGS);
    cleaned = COMMENT.replace_all(&cleaned, "").into_owned();
    cleaned = remove_empty_nodes(&cleaned);

    if let Some(base) = base_url {
        cleaned = absolutize_urls(&cleaned, base);
    }

    cleaned.trim().to_string()
}

/// Removes every element matching any of `selectors`.
///
/// Selectors the streaming rewriter cannot evaluate are skipped with a
/// debug log rather than failing the extraction.
pub fn remove_selectors<S: AsRef<str>>(html: &str, selectors: &[S]) -> String {
    let usable: Vec<&str> = selectors
        .iter()
        .map(AsRef::as_ref)
        .filter(|sel| match sel.parse::<lol_html::Selector>() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(selector = *sel, error = %e, "skipping unsupported clean selector");
                false
            }
        })
        .collect();

    if usable.is_empty() {
        return html.to_string();
    }

    let handlers = usable
        .iter()
        .map(|sel| {
            lol_html::element!(sel, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite(html, handlers)
}

/// Rewrites relative `a[href]` and `img[src]` values to absolute URLs.
pub fn absolutize_urls(html: &str, base_url: &Url) -> String {
    let handlers = vec![
        lol_html::element!("a[href]", |el| {
            if let Some(href) = el.get_attribute("href")
                && let Ok(absolute) = base_url.join(&href)
            {
                el.set_attribute("href", absolute.as_str()).ok();
            }
            Ok(())
        }),
        lol_html::element!("img[src]", |el| {
            if let Some(src) = el.get_attribute("src")
                && let Ok(absolute) = base_url.join(&src)
            {
                el.set_attribute("src", absolute.as_str()).ok();
            }
            Ok(())
        }),
    ];

    rewrite(html, handlers)
}

fn remove_empty_nodes(html: &str) -> String {
    let mut result = html.to_string();

    for _ in 0..MAX_EMPTY_PASSES {
        let mut modified = false;
        for re in EMPTY_NODES.iter() {
            if let Cow::Owned(replaced) = re.replace_all(&result, "") {
                result = replaced;
                modified = true;
            }
        }
        if !modified {
            break;
        }
    }

    result
}

fn rewrite(
    html: &str, handlers: Vec<(Cow<'_, lol_html::Selector>, lol_html::ElementContentHandlers<'_>)>,
) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    output
}
