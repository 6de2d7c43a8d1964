// file: src/content/classifier.rs
// description: integration tagging of workflow documents by node type and resource
// reference: https://docs.rs/regex

use crate::config::IntegrationRule;
use crate::error::{HarvestError, Result};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::BTreeSet;

pub const UNCATEGORISED: &str = "uncategorised";

/// Built-in services in match priority order, as `(label, pattern)`.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("airtable", "airtable"),
    ("slack", "slack"),
    ("gmail", "gmail"),
    ("telegram", "telegram"),
    ("google drive", "google[s ]?drive"),
    ("notion", "notion"),
    ("discord", "discord"),
    ("http", "http"),
    ("webhook", "webhook"),
];

lazy_static! {
    static ref BUILTIN_MATCHER: Regex = alternation(BUILTIN_RULES.iter().map(|(_, p)| *p))
        .expect("builtin integration patterns are valid");
}

/// One case-insensitive alternation; the earliest listed pattern wins a tie.
fn alternation<'a>(
    patterns: impl IntoIterator<Item = &'a str>,
) -> std::result::Result<Regex, regex::Error> {
    let joined = patterns
        .into_iter()
        .map(|p| format!("(?:{})", p))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&joined).case_insensitive(true).build()
}

/// Tags workflows by the services their nodes talk to.
///
/// Each node's `type` and `parameters.resource` strings are searched once; the
/// leftmost match, lower-cased, becomes the tag. `Google Drive` therefore tags
/// as `google drive` while `googleDrive` tags as `googledrive`.
#[derive(Debug, Clone)]
pub struct IntegrationClassifier {
    labels: Vec<String>,
    matcher: Regex,
}

impl IntegrationClassifier {
    pub fn new() -> Self {
        Self {
            labels: BUILTIN_RULES.iter().map(|(label, _)| label.to_string()).collect(),
            matcher: BUILTIN_MATCHER.clone(),
        }
    }

    /// Built-in services followed by the configured extras, which only win
    /// where no built-in pattern matches earlier in the string.
    pub fn with_extra(extra: &[IntegrationRule]) -> Result<Self> {
        if extra.is_empty() {
            return Ok(Self::new());
        }

        for rule in extra {
            RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| HarvestError::Pattern(format!("{}: {}", rule.name, e)))?;
        }

        let patterns = BUILTIN_RULES
            .iter()
            .map(|(_, p)| *p)
            .chain(extra.iter().map(|rule| rule.pattern.as_str()));
        let matcher = alternation(patterns).map_err(|e| HarvestError::Pattern(e.to_string()))?;

        let mut labels = Self::new().labels;
        labels.extend(extra.iter().map(|rule| rule.name.trim().to_lowercase()));

        Ok(Self { labels, matcher })
    }

    /// Labels of the known services, for display.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Integration tags for a workflow document; never empty.
    pub fn classify(&self, document: &Value) -> BTreeSet<String> {
        let mut tags = BTreeSet::new();

        for node in nodes(document) {
            let node_type = node.get("type").and_then(Value::as_str);
            let resource = node
                .get("parameters")
                .and_then(|p| p.get("resource"))
                .and_then(Value::as_str);

            for field in [node_type, resource].into_iter().flatten() {
                if let Some(found) = self.matcher.find(field).filter(|m| !m.as_str().is_empty()) {
                    tags.insert(found.as_str().to_lowercase());
                }
            }
        }

        if tags.is_empty() {
            tags.insert(UNCATEGORISED.to_string());
        }
        tags
    }

    /// `classify` as a sorted list, the form stored in the catalogue.
    pub fn classify_sorted(&self, document: &Value) -> Vec<String> {
        self.classify(document).into_iter().collect()
    }
}

impl Default for IntegrationClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn nodes(document: &Value) -> impl Iterator<Item = &Value> {
    document
        .get("nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}
