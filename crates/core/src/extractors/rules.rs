use crate::error::{QuireError, Result};
use crate::parse::{Document, Element};

/// One entry in a field's selector chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    /// Take the element's text content.
    Text(String),
    /// Take the named attribute of the element.
    Attr(String, String),
}

impl FieldSelector {
    pub fn attr(selector: &str, attribute: &str) -> Self {
        FieldSelector::Attr(selector.to_string(), attribute.to_string())
    }

    /// The CSS part of the selector.
    pub fn css(&self) -> &str {
        match self {
            FieldSelector::Text(css) | FieldSelector::Attr(css, _) => css,
        }
    }
}

impl From<&str> for FieldSelector {
    fn from(selector: &str) -> Self {
        FieldSelector::Text(selector.to_string())
    }
}

impl From<(&str, &str)> for FieldSelector {
    fn from((selector, attribute): (&str, &str)) -> Self {
        FieldSelector::attr(selector, attribute)
    }
}

/// A content transform run before content selection.
///
/// Transforms never touch the parsed tree directly; they return HTML and the
/// engine re-parses the document with it spliced in.
#[derive(Debug, Clone)]
pub enum Transform {
    /// Runs once against the whole document. Returned HTML is appended to `<body>`.
    Document(fn(&Document) -> Option<String>),
    /// Runs against every element matching `selector`. Returned HTML replaces the element.
    Element { selector: String, apply: fn(&Element<'_>) -> Option<String> },
}

/// Rules for the `content` field.
#[derive(Debug, Clone)]
pub struct ContentRule {
    /// Candidate containers, first non-empty match wins.
    pub selectors: Vec<String>,
    /// Elements removed from the selected content.
    pub clean: Vec<String>,
    /// Document rewrites applied before selection, in order.
    pub transforms: Vec<Transform>,
    /// Whether the generic boilerplate cleaner runs on the selected content.
    pub default_cleaner: bool,
}

impl Default for ContentRule {
    fn default() -> Self {
        Self { selectors: Vec::new(), clean: Vec::new(), transforms: Vec::new(), default_cleaner: true }
    }
}

/// Declarative per-domain extraction configuration.
///
/// Each scalar field holds an ordered selector chain; the first selector
/// resolving to a non-empty value wins and later ones are never evaluated.
#[derive(Debug, Clone, Default)]
pub struct ExtractionRuleSet {
    /// Hostname the rule set is registered under.
    pub domain: String,
    /// Extra hostnames sharing this rule set.
    pub aliases: Vec<String>,
    pub title: Vec<FieldSelector>,
    pub author: Vec<FieldSelector>,
    pub date_published: Vec<FieldSelector>,
    pub lead_image_url: Vec<FieldSelector>,
    pub excerpt: Vec<FieldSelector>,
    pub content: ContentRule,
}

/// A single line of a rule file.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Domain(String),
    Alias(String),

    Title(FieldSelector),
    Author(FieldSelector),
    DatePublished(FieldSelector),
    LeadImageUrl(FieldSelector),
    Excerpt(FieldSelector),

    Content(String),
    Clean(String),
    DefaultCleaner(bool),
}

impl ExtractionRuleSet {
    pub fn new(domain: &str) -> Self {
        Self { domain: domain.to_string(), ..Default::default() }
    }

    /// Add a directive to this rule set
    pub fn add_directive(&mut self, directive: Directive) {
        match directive {
            Directive::Domain(domain) => self.domain = domain,
            Directive::Alias(alias) => self.aliases.push(alias),

            Directive::Title(sel) => self.title.push(sel),
            Directive::Author(sel) => self.author.push(sel),
            Directive::DatePublished(sel) => self.date_published.push(sel),
            Directive::LeadImageUrl(sel) => self.lead_image_url.push(sel),
            Directive::Excerpt(sel) => self.excerpt.push(sel),

            Directive::Content(sel) => self.content.selectors.push(sel),
            Directive::Clean(sel) => self.content.clean.push(sel),
            Directive::DefaultCleaner(value) => self.content.default_cleaner = value,
        }
    }

    /// Every hostname this rule set answers for.
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Check if this rule set has anything to extract with
    pub fn has_extraction_rules(&self) -> bool {
        !self.content.selectors.is_empty()
            || !self.content.transforms.is_empty()
            || [&self.title, &self.author, &self.date_published, &self.lead_image_url, &self.excerpt]
                .iter()
                .any(|field| !field.is_empty())
    }
}

/// Parse a directive line from a rule file.
///
/// Field values are CSS selectors; a trailing `@name` token selects an
/// attribute instead of the text, e.g. `lead_image_url: meta[property="og:image"] @content`.
pub fn parse_directive(line: &str) -> Result<Directive> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(QuireError::RuleError("Empty or comment line".to_string()));
    }

    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| QuireError::RuleError(format!("Invalid directive format: {}", line)))?;
    let key = key.trim();
    let value = value.trim();

    if value.is_empty() {
        return Err(QuireError::RuleError(format!("Missing value for {}", key)));
    }

    match key {
        "domain" => Ok(Directive::Domain(value.to_lowercase())),
        "alias" => Ok(Directive::Alias(value.to_lowercase())),

        "title" => Ok(Directive::Title(parse_field_selector(value))),
        "author" => Ok(Directive::Author(parse_field_selector(value))),
        "date_published" => Ok(Directive::DatePublished(parse_field_selector(value))),
        "lead_image_url" => Ok(Directive::LeadImageUrl(parse_field_selector(value))),
        "excerpt" => Ok(Directive::Excerpt(parse_field_selector(value))),

        "content" => Ok(Directive::Content(value.to_string())),
        "clean" => Ok(Directive::Clean(value.to_string())),
        "default_cleaner" => Ok(Directive::DefaultCleaner(parse_boolean(value)?)),

        _ => Err(QuireError::RuleError(format!("Unknown directive: {}", key))),
    }
}

fn parse_field_selector(value: &str) -> FieldSelector {
    match value.rsplit_once(char::is_whitespace) {
        Some((css, attr)) if attr.len() > 1 && attr.starts_with('@') => FieldSelector::attr(css.trim(), &attr[1..]),
        _ => FieldSelector::Text(value.to_string()),
    }
}

/// Parse a boolean value from a rule file
fn parse_boolean(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(QuireError::RuleError(format!("Invalid boolean value: {}", value))),
    }
}
