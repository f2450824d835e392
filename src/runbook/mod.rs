//! Per-component keyword runbooks.
//!
//! A runbook is a markdown file with one section per product component. Each
//! section holds a table mapping failure-message keywords to the category of
//! failure they indicate.

mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Kind of failure a runbook keyword points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ProductBug,
    AutomationBug,
    SystemIssue,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::ProductBug,
        Category::AutomationBug,
        Category::SystemIssue,
    ];

    /// Parse the free-form category cell of a runbook table. The leading
    /// word decides; `test bug` is an automation bug.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text
            .trim()
            .trim_matches('*')
            .to_lowercase()
            .replace(['-', '_'], " ");
        let mut words = normalized.split_whitespace();

        match (words.next()?, words.next()) {
            ("product", _) => Some(Category::ProductBug),
            ("automation", _) | ("test", Some("bug")) => Some(Category::AutomationBug),
            ("system", _) | ("environment", _) => Some(Category::SystemIssue),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::ProductBug => "Product bug",
            Category::AutomationBug => "Automation bug",
            Category::SystemIssue => "System issue",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a runbook keyword is matched against failure text.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Case-insensitive substring; stored lower-cased.
    Substring(String),
    /// Written as `/.../` in the runbook.
    Regex(Regex),
}

impl Pattern {
    pub fn parse(keyword: &str) -> Result<Self> {
        let keyword = keyword.trim();
        if keyword.len() > 2 && keyword.starts_with('/') && keyword.ends_with('/') {
            let body = &keyword[1..keyword.len() - 1];
            let re = Regex::new(&format!("(?i){body}"))
                .map_err(|e| AppError::Runbook(format!("Invalid keyword pattern {keyword}: {e}")))?;
            Ok(Pattern::Regex(re))
        } else {
            Ok(Pattern::Substring(keyword.to_lowercase()))
        }
    }

    /// `haystack_lower` must already be lower-cased.
    pub fn is_match(&self, haystack_lower: &str) -> bool {
        match self {
            Pattern::Substring(needle) => haystack_lower.contains(needle.as_str()),
            Pattern::Regex(re) => re.is_match(haystack_lower),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunbookEntry {
    pub component: String,
    pub category: Category,
    /// The keyword as written in the runbook.
    pub keyword: String,
    pub pattern: Pattern,
}

#[derive(Debug, Clone)]
struct Section {
    guidelines: String,
    entries: Vec<RunbookEntry>,
}

/// Parsed runbook, keyed by lower-cased component name.
#[derive(Debug, Clone, Default)]
pub struct Runbook {
    sections: BTreeMap<String, Section>,
}

impl Runbook {
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Runbook(format!("Failed to read runbook {}: {e}", path.display()))
        })?;
        let runbook = Self::parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            components = runbook.sections.len(),
            "Loaded runbook"
        );
        Ok(runbook)
    }

    pub fn entries(&self, component: &str) -> &[RunbookEntry] {
        self.sections
            .get(&component.to_lowercase())
            .map(|s| s.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Raw markdown of a component's section, used as model context.
    pub fn guidelines(&self, component: &str) -> &str {
        self.sections
            .get(&component.to_lowercase())
            .map(|s| s.guidelines.as_str())
            .unwrap_or("")
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.sections.contains_key(&component.to_lowercase())
    }
}
