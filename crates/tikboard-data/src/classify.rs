//! Ordered-rule classification of free-text group labels.

use crate::merge::MergedTable;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Separators found inside multi-token group labels, ASCII and full-width.
pub static GROUP_SEPARATOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,|/;，；]").expect("Invalid group separator regex pattern"));

/// Split a group label into trimmed, non-empty tokens.
pub fn split_group_label(label: &str) -> Vec<&str> {
    GROUP_SEPARATOR_REGEX
        .split(label)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Sorted distinct tokens across every merged row's group label.
pub fn available_groups(merged: &MergedTable) -> Vec<String> {
    let tokens: BTreeSet<&str> = merged
        .rows()
        .iter()
        .flat_map(|row| split_group_label(&row.group))
        .collect();
    tokens.into_iter().map(str::to_string).collect()
}

/// How keyword rules compare against labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Exact-case substring test
    #[default]
    CaseSensitive,
    /// Substring test after lower-casing both sides
    CaseInsensitive,
}

impl MatchMode {
    /// Whether `needle` occurs in `haystack` under this mode.
    pub fn contains(self, haystack: &str, needle: &str) -> bool {
        match self {
            MatchMode::CaseSensitive => haystack.contains(needle),
            MatchMode::CaseInsensitive => haystack.to_lowercase().contains(&needle.to_lowercase()),
        }
    }
}

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct Rule {
    predicate: Predicate,
    label: String,
}

/// Ordered `(predicate, label)` rules; the first matching rule names the label.
#[derive(Default)]
pub struct GroupClassifier {
    rules: Vec<Rule>,
}

impl fmt::Debug for GroupClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupClassifier")
            .field("labels", &self.labels().collect::<Vec<_>>())
            .finish()
    }
}

impl GroupClassifier {
    /// Classifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// One substring rule per keyword, in the given order. Blank keywords are skipped.
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S], mode: MatchMode) -> Self {
        keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .fold(Self::new(), |classifier, keyword| {
                let needle = keyword.to_string();
                classifier.with_rule(keyword, move |label| mode.contains(label, &needle))
            })
    }

    /// Append a rule evaluated after every existing one.
    #[must_use]
    pub fn with_rule<F>(mut self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            predicate: Box::new(predicate),
            label: label.into(),
        });
        self
    }

    /// Label of the first matching rule.
    pub fn classify(&self, group: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(group))
            .map(|rule| rule.label.as_str())
    }

    /// The first matching label, or `group` itself when nothing matches.
    pub fn normalize<'a>(&'a self, group: &'a str) -> &'a str {
        self.classify(group).unwrap_or(group)
    }

    /// Rule labels in evaluation order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.label.as_str())
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
