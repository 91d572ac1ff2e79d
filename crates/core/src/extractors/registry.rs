use crate::error::Result;
use crate::extractors::custom;
use crate::extractors::parser::RuleFileParser;
use crate::extractors::rules::ExtractionRuleSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Immutable hostname → rule set map.
///
/// Built once through [`RegistryBuilder`] and shared read-only afterwards.
/// Aliases point at the same `Arc` as the primary domain.
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    by_host: HashMap<String, Arc<ExtractionRuleSet>>,
}

impl ExtractorRegistry {
    /// Registry holding only the built-in site extractors.
    pub fn builtin() -> Self {
        RegistryBuilder::new().with_builtin().build()
    }

    /// Look up the rule set for an exact hostname.
    pub fn get(&self, host: &str) -> Option<Arc<ExtractionRuleSet>> {
        self.by_host.get(&host.to_ascii_lowercase()).cloned()
    }

    /// Look up the rule set for a URL's hostname.
    pub fn for_url(&self, url: &Url) -> Option<Arc<ExtractionRuleSet>> {
        url.host_str().and_then(|host| self.get(host))
    }

    /// Number of registered hostnames, aliases included.
    pub fn len(&self) -> usize {
        self.by_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.by_host.keys().map(String::as_str)
    }
}

/// Builder for ExtractorRegistry
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    by_host: HashMap<String, Arc<ExtractionRuleSet>>,
}

impl RegistryBuilder {
    /// Create a new, empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule set under its domain and every alias.
    ///
    /// A later registration for the same hostname replaces the earlier one.
    pub fn register(&mut self, rules: ExtractionRuleSet) -> &mut Self {
        let rules = Arc::new(rules);
        for host in rules.hostnames() {
            if self.by_host.insert(host.to_ascii_lowercase(), Arc::clone(&rules)).is_some() {
                tracing::debug!(host, "replacing previously registered extractor");
            }
        }
        self
    }

    /// Register the built-in site extractors.
    pub fn with_builtin(mut self) -> Self {
        custom::register_all(&mut self);
        self
    }

    /// Register every `*.txt` rule file in `dir`.
    ///
    /// Files that fail to parse are skipped with a warning; a missing
    /// directory registers nothing.
    pub fn with_rule_dir<P: AsRef<Path>>(mut self, dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Ok(self);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        paths.sort();

        for path in paths {
            match RuleFileParser::parse_file(&path) {
                Ok(rules) => {
                    self.register(rules);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to parse rule file"),
            }
        }

        Ok(self)
    }

    /// Build the ExtractorRegistry
    pub fn build(self) -> ExtractorRegistry {
        ExtractorRegistry { by_host: self.by_host }
    }
}

/// Default directory for user rule files (`~/.config/quire/extractors`).
pub fn default_rule_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("quire").join("extractors"))
}
