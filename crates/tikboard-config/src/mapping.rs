//! Link-to-group and group-to-page-type rules.
//!
//! Both lists are ordered; lookups scan them front to back and the first
//! matching rule wins.

use crate::validation::{validate_link, validate_page_type};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tikboard_common::{normalize_url, DashError, Result, OTHER_PAGE_TYPE, UNKNOWN_LINK_GROUP};
use validator::{ValidationErrors, ValidationError};

/// A tracked landing link and the account group it converts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkGroupRule {
    /// Landing page URL as published
    pub link: String,
    /// Target account group
    pub group: String,
}

impl LinkGroupRule {
    /// Build a rule.
    pub fn new(link: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            group: group.into(),
        }
    }

    /// The link with scheme and query stripped.
    pub fn normalized_link(&self) -> String {
        normalize_url(&self.link)
    }
}

/// A group-name fragment and the page type that group's traffic lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPageRule {
    /// Fragment searched for inside group labels
    pub group: String,
    /// One of the valid page types
    pub page_type: String,
    /// Free-form note shown next to the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupPageRule {
    /// Build a rule without a description.
    pub fn new(group: impl Into<String>, page_type: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            page_type: page_type.into(),
            description: None,
        }
    }
}

/// Counts describing a mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingStatistics {
    /// Number of link rules
    pub link_rules: usize,
    /// Number of group-to-page rules
    pub page_rules: usize,
    /// Distinct page types referenced
    pub page_types: Vec<String>,
    /// Distinct groups referenced by either list
    pub groups: Vec<String>,
}

/// Session-owned mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMappingTable {
    links: Vec<LinkGroupRule>,
    pages: Vec<GroupPageRule>,
}

impl GroupMappingTable {
    /// Build from explicit rule lists.
    pub fn new(links: Vec<LinkGroupRule>, pages: Vec<GroupPageRule>) -> Self {
        Self { links, pages }
    }

    /// Link rules in priority order.
    pub fn links(&self) -> &[LinkGroupRule] {
        &self.links
    }

    /// Group-to-page rules in priority order.
    pub fn pages(&self) -> &[GroupPageRule] {
        &self.pages
    }

    /// Page type for a group label.
    ///
    /// Case-insensitive: the first rule whose fragment occurs inside the
    /// label wins. Falls back to `"other"`.
    pub fn page_type_for_group(&self, group_label: &str) -> &str {
        let label = group_label.trim().to_lowercase();
        self.pages
            .iter()
            .find(|rule| label.contains(&rule.group.trim().to_lowercase()))
            .map_or(OTHER_PAGE_TYPE, |rule| rule.page_type.as_str())
    }

    /// Group fragments mapped to `page_type`, in rule order.
    pub fn groups_for_page_type(&self, page_type: &str) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|rule| rule.page_type == page_type)
            .map(|rule| rule.group.as_str())
            .collect()
    }

    /// Group whose link occurs in `url`, or `"unknown"`.
    pub fn group_for_link(&self, url: &str) -> &str {
        self.links
            .iter()
            .find(|rule| url.contains(&rule.link))
            .map_or(UNKNOWN_LINK_GROUP, |rule| rule.group.as_str())
    }

    /// Rule whose normalized link equals the normalized `url`.
    pub fn rule_for_url(&self, url: &str) -> Option<&LinkGroupRule> {
        let wanted = normalize_url(url);
        self.links.iter().find(|rule| rule.normalized_link() == wanted)
    }

    /// Whether `page_type` is one a rule may target.
    pub fn is_valid_page_type(page_type: &str) -> bool {
        validate_page_type(page_type).is_ok()
    }

    /// Append a group-to-page rule, or replace the page type of an existing fragment.
    pub fn add_page_rule(&mut self, rule: GroupPageRule) -> Result<()> {
        if rule.group.trim().is_empty() {
            return Err(DashError::validation_field("group fragment is empty", "group"));
        }
        if !Self::is_valid_page_type(&rule.page_type) {
            return Err(DashError::validation_field(
                format!("unknown page type '{}'", rule.page_type),
                "page_type",
            ));
        }
        match self.pages.iter_mut().find(|r| r.group == rule.group) {
            Some(existing) => *existing = rule,
            None => self.pages.push(rule),
        }
        Ok(())
    }

    /// Remove the rule for a group fragment; returns whether one was removed.
    pub fn remove_page_rule(&mut self, group: &str) -> bool {
        let before = self.pages.len();
        self.pages.retain(|r| r.group != group);
        before != self.pages.len()
    }

    /// Summary counts.
    pub fn statistics(&self) -> MappingStatistics {
        let page_types: BTreeSet<&str> = self.pages.iter().map(|r| r.page_type.as_str()).collect();
        let groups: BTreeSet<&str> = self
            .links
            .iter()
            .map(|r| r.group.as_str())
            .chain(self.pages.iter().map(|r| r.group.as_str()))
            .collect();
        MappingStatistics {
            link_rules: self.links.len(),
            page_rules: self.pages.len(),
            page_types: page_types.into_iter().map(str::to_string).collect(),
            groups: groups.into_iter().map(str::to_string).collect(),
        }
    }

    /// Check every rule: links must have a host, page types must be known,
    /// groups must be non-empty.
    pub fn validate_rules(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for rule in &self.links {
            if let Err(err) = validate_link(&rule.link) {
                errors.add("links", err);
            }
            if rule.group.trim().is_empty() {
                errors.add("links", ValidationError::new("empty_group"));
            }
        }

        for rule in &self.pages {
            if let Err(err) = validate_page_type(&rule.page_type) {
                errors.add("pages", err);
            }
            if rule.group.trim().is_empty() {
                errors.add("pages", ValidationError::new("empty_group"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
