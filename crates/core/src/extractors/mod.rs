//! Per-site extraction rules.
//!
//! A rule set is a declarative [`ExtractionRuleSet`] of selector chains. Rule
//! sets come from two places: the built-in extractors in [`custom`] and
//! user rule files parsed by [`RuleFileParser`]. Both end up in an
//! [`ExtractorRegistry`] keyed by exact hostname.

pub mod custom;
pub mod parser;
pub mod registry;
pub mod rules;

pub use parser::RuleFileParser;
pub use registry::{ExtractorRegistry, RegistryBuilder, default_rule_dir};
pub use rules::{ContentRule, Directive, ExtractionRuleSet, FieldSelector, Transform, parse_directive};
