use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, Result};

const BUILTIN_CATALOG: &str = include_str!("../../rules/components.toml");

/// How a component's Jenkins job filters tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagStyle {
    /// Functional tags joined as-is.
    #[default]
    Plain,
    /// `@`-prefixed functional tags and test-case numbers.
    Numbered,
}

/// Which build parameters the trigger sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    /// User parameters plus PR metadata, with the tag placeholder filled in.
    #[default]
    Merge,
    /// Only `TEST_TAGS`.
    TagsOnly,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathRule {
    pub pattern: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentProfile {
    pub name: String,
    pub repo_keywords: Vec<String>,
    pub test_repo: String,
    pub test_file_suffixes: Vec<String>,
    pub jenkins_job: String,
    #[serde(default)]
    pub tag_style: TagStyle,
    #[serde(default)]
    pub trigger_mode: TriggerMode,
    #[serde(default)]
    pub default_tags: Vec<String>,
    #[serde(default)]
    pub excluded_tags: Vec<String>,
    #[serde(default)]
    pub critical_patterns: Vec<String>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<PathRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(rename = "component")]
    pub components: Vec<ComponentProfile>,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Rules(format!("Failed to read rules file {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Parse and validate every pattern up front so bad rules fail at startup.
    pub fn parse(text: &str) -> Result<Self> {
        let catalog: Catalog =
            toml::from_str(text).map_err(|e| AppError::Rules(format!("Invalid rules file: {e}")))?;

        for profile in &catalog.components {
            for pattern in profile
                .rules
                .iter()
                .map(|r| r.pattern.as_str())
                .chain(profile.critical_patterns.iter().map(String::as_str))
            {
                Regex::new(pattern).map_err(|e| {
                    AppError::Rules(format!(
                        "Invalid pattern {pattern:?} for component {}: {e}",
                        profile.name
                    ))
                })?;
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&ComponentProfile> {
        self.components
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// First component (catalog order) with a keyword contained in the repo name.
    pub fn detect(&self, repo_name: &str) -> Option<&ComponentProfile> {
        let repo = repo_name.to_lowercase();
        self.components.iter().find(|c| {
            c.repo_keywords
                .iter()
                .any(|k| repo.contains(&k.to_lowercase()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        let names: Vec<&str> = catalog.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["global-hub", "grc", "search", "alc", "clc"]);

        let grc = catalog.get("GRC").unwrap();
        assert_eq!(grc.tag_style, TagStyle::Numbered);
        assert_eq!(grc.jenkins_job, "qe-acm-automation-poc/grc-e2e-test-execution");

        let hub = catalog.get("global-hub").unwrap();
        assert_eq!(hub.trigger_mode, TriggerMode::TagsOnly);
        assert_eq!(hub.rules[0].pattern, "agent/pkg/status/");
    }

    #[test]
    fn test_detect_component() {
        let catalog = Catalog::builtin().unwrap();
        let cases = [
            ("multicluster-global-hub", Some("global-hub")),
            ("glo-grafana", Some("global-hub")),
            ("config-policy-controller", Some("grc")),
            ("gatekeeper-operator", Some("grc")),
            ("search-v2-api", Some("search")),
            ("application-ui", Some("alc")),
            ("cluster-curator-controller", Some("clc")),
            ("console", None),
        ];
        for (repo, expected) in cases {
            assert_eq!(
                catalog.detect(repo).map(|c| c.name.as_str()),
                expected,
                "repo: {repo}"
            );
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let text = r#"
[[component]]
name = "x"
repo_keywords = ["x"]
test_repo = "https://example.com/x.git"
test_file_suffixes = [".cy.js"]
jenkins_job = "x"

[[component.rule]]
pattern = "controllers/(["
tags = ["a"]
"#;
        let err = Catalog::parse(text).unwrap_err();
        assert!(err.to_string().contains("Invalid pattern"));
    }
}
