use crate::error::{QuireError, Result};
use crate::extractors::rules::{ExtractionRuleSet, parse_directive};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Rule file parser.
///
/// A rule file holds one directive per line (`field: selector`), `#` comments
/// and blank lines. It must name its `domain`.
#[derive(Debug)]
pub struct RuleFileParser;

impl RuleFileParser {
    /// Parse a single rule file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ExtractionRuleSet> {
        let file = std::fs::File::open(&path)
            .map_err(|e| QuireError::RuleError(format!("Cannot open file {}: {}", path.as_ref().display(), e)))?;

        Self::parse_reader(BufReader::new(file))
    }

    /// Parse a rule file from a reader
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<ExtractionRuleSet> {
        let mut lines = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| QuireError::RuleError(format!("Read error at line {}: {}", index + 1, e)))?;
            lines.push(line);
        }
        Self::parse_lines(lines.iter().map(String::as_str))
    }

    /// Parse a rule file from a string
    pub fn parse_string(content: &str) -> Result<ExtractionRuleSet> {
        Self::parse_lines(content.lines())
    }

    fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<ExtractionRuleSet> {
        let mut rules = ExtractionRuleSet::default();

        for (index, line) in lines.enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let directive = parse_directive(line)
                .map_err(|e| QuireError::RuleError(format!("Parse error at line {}: {}", index + 1, e)))?;
            rules.add_directive(directive);
        }

        if rules.domain.is_empty() {
            return Err(QuireError::RuleError("Rule file has no domain directive".to_string()));
        }
        if !rules.has_extraction_rules() {
            return Err(QuireError::RuleError(format!("Rule file for {} has no extraction rules", rules.domain)));
        }

        Ok(rules)
    }
}
