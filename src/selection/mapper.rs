use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;

use super::catalog::ComponentProfile;
use crate::error::Result;
use crate::platform::types::ChangedFile;

/// Tags derived for one changed file.
#[derive(Debug, Clone, Serialize)]
pub struct FileTags {
    pub filename: String,
    pub tags: BTreeSet<String>,
    /// False when no rule matched and the default tags were applied.
    pub matched_rule: bool,
}

/// Result of mapping a PR's changed files to test tags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagSelection {
    /// Every selected tag, rule-derived and default.
    pub tags: BTreeSet<String>,
    /// Tags that only came from the default set for unmatched files.
    pub fallback_tags: BTreeSet<String>,
    pub files: Vec<FileTags>,
    pub is_critical: bool,
    pub is_docs_only: bool,
}

impl TagSelection {
    pub fn unmatched_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|f| !f.matched_rule)
            .map(|f| f.filename.as_str())
    }

    pub fn is_fallback_only(&self, tag: &str) -> bool {
        self.fallback_tags.contains(tag)
    }
}

struct CompiledRule {
    pattern: Regex,
    tags: Vec<String>,
}

/// Maps changed file paths to tags using one component's rule table.
pub struct TagMapper {
    rules: Vec<CompiledRule>,
    critical: Vec<Regex>,
    default_tags: Vec<String>,
    excluded_tags: Vec<String>,
}

impl TagMapper {
    pub fn new(profile: &ComponentProfile) -> Result<Self> {
        let rules = profile
            .rules
            .iter()
            .map(|r| {
                Ok(CompiledRule {
                    pattern: Regex::new(&r.pattern)?,
                    tags: r.tags.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let critical = profile
            .critical_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            critical,
            default_tags: profile.default_tags.clone(),
            excluded_tags: profile.excluded_tags.clone(),
        })
    }

    /// Every file is documentation (`.md`, `.txt`, or under `docs/`).
    pub fn is_docs_only(&self, files: &[ChangedFile]) -> bool {
        !files.is_empty()
            && files.iter().all(|f| {
                f.filename.ends_with(".md")
                    || f.filename.ends_with(".txt")
                    || f.filename.contains("docs/")
            })
    }

    pub fn is_critical(&self, files: &[ChangedFile]) -> bool {
        files
            .iter()
            .any(|f| self.critical.iter().any(|p| p.is_match(&f.filename)))
    }

    pub fn map_files(&self, files: &[ChangedFile]) -> TagSelection {
        if self.is_docs_only(files) {
            tracing::info!("Docs-only change, skipping test selection");
            return TagSelection {
                is_docs_only: true,
                ..Default::default()
            };
        }

        let is_critical = self.is_critical(files);
        if is_critical {
            tracing::warn!("Critical path changed, every selected test becomes must-run");
        }

        let mut rule_tags = BTreeSet::new();
        let mut any_unmatched = false;
        let mut mapped = Vec::with_capacity(files.len());

        for file in files {
            let mut tags = BTreeSet::new();
            let mut matched_rule = false;
            for rule in self.rules.iter().filter(|r| r.pattern.is_match(&file.filename)) {
                matched_rule = true;
                tags.extend(rule.tags.iter().cloned());
            }

            if matched_rule {
                rule_tags.extend(tags.iter().cloned());
            } else {
                any_unmatched = true;
                tags.extend(self.default_tags.iter().cloned());
            }
            tags.retain(|t| !self.excluded_tags.contains(t));

            tracing::info!(
                file = %file.filename,
                tags = %join(&tags),
                matched_rule,
                "Mapped changed file"
            );
            mapped.push(FileTags {
                filename: file.filename.clone(),
                tags,
                matched_rule,
            });
        }

        let mut fallback_tags: BTreeSet<String> = if any_unmatched {
            self.default_tags
                .iter()
                .filter(|t| !rule_tags.contains(*t))
                .cloned()
                .collect()
        } else {
            BTreeSet::new()
        };

        let mut all_tags: BTreeSet<String> = rule_tags.union(&fallback_tags).cloned().collect();
        for excluded in &self.excluded_tags {
            if all_tags.remove(excluded) {
                tracing::warn!(tag = %excluded, "Dropped excluded tag");
            }
            fallback_tags.remove(excluded);
        }

        if all_tags.is_empty() {
            tracing::warn!("No tags matched, the PR needs manual test selection");
        } else {
            tracing::info!(count = all_tags.len(), tags = %join(&all_tags), "Selected tags");
        }

        TagSelection {
            tags: all_tags,
            fallback_tags,
            files: mapped,
            is_critical,
            is_docs_only: false,
        }
    }
}

fn join(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::catalog::Catalog;

    fn mapper(component: &str) -> TagMapper {
        let catalog = Catalog::builtin().unwrap();
        TagMapper::new(catalog.get(component).unwrap()).unwrap()
    }

    fn files(names: &[&str]) -> Vec<ChangedFile> {
        names.iter().map(|n| ChangedFile::new(*n)).collect()
    }

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_path_to_tag_table() {
        let cases: &[(&str, &str, &[&str])] = &[
            (
                "global-hub",
                "agent/pkg/status/syncers/policy.go",
                &["addon", "event", "migration", "operand", "status"],
            ),
            ("global-hub", "manager/pkg/processes/kafka.go", &["event", "kafka"]),
            ("global-hub", "operator/pkg/controllers/hub.go", &["create", "import", "operand"]),
            ("global-hub", "pkg/database/dao/event.go", &["migration", "postgres", "retention"]),
            ("global-hub", "grafana/dashboards/overview.tsx", &["grafana"]),
            ("grc", "controllers/configurationpolicy/configurationpolicy_utils.go", &["zstream"]),
            ("grc", "controllers/policyset/policyset_controller.go", &["policyset"]),
            ("grc", "pkg/gatekeeper/sync.go", &["gatekeeper"]),
            ("grc", "controllers/configurationpolicy/helpers_test.go", &["zstream"]),
            ("search", "pkg/resolver/search.go", &["BVT", "SVT"]),
            ("search", "pkg/informer/informer.go", &["BVT"]),
        ];

        for (component, path, expected) in cases {
            let selection = mapper(component).map_files(&files(&[path]));
            assert_eq!(selection.tags, tags(expected), "{component}: {path}");
            assert!(selection.files[0].matched_rule, "{component}: {path}");
        }
    }

    #[test]
    fn test_union_across_files() {
        let selection = mapper("global-hub").map_files(&files(&[
            "manager/pkg/processes/kafka.go",
            "pkg/database/dao/event.go",
        ]));
        assert_eq!(
            selection.tags,
            tags(&["event", "kafka", "migration", "postgres", "retention"])
        );
    }

    #[test]
    fn test_docs_only_change_selects_nothing() {
        let m = mapper("grc");
        let selection = m.map_files(&files(&["README.md", "docs/architecture.png", "NOTES.txt"]));
        assert!(selection.is_docs_only);
        assert!(selection.tags.is_empty());
        assert!(selection.files.is_empty());
        assert!(!m.is_docs_only(&[]));
    }

    #[test]
    fn test_critical_detection() {
        let m = mapper("global-hub");
        assert!(m.is_critical(&files(&["pkg/database/models/event.go"])));
        assert!(m.is_critical(&files(&["operator/config/rbac/role.yaml"])));
        assert!(!m.is_critical(&files(&["manager/cmd/main.go"])));
    }

    #[test]
    fn test_unmatched_files_get_default_tags() {
        let selection = mapper("search").map_files(&files(&["cmd/main.go"]));
        assert_eq!(selection.tags, tags(&["BVT"]));
        assert_eq!(selection.fallback_tags, tags(&["BVT"]));
        assert_eq!(selection.unmatched_files().collect::<Vec<_>>(), vec!["cmd/main.go"]);
    }

    #[test]
    fn test_fallback_tag_also_matched_by_rule_is_not_fallback() {
        let selection =
            mapper("search").map_files(&files(&["cmd/main.go", "pkg/informer/informer.go"]));
        assert_eq!(selection.tags, tags(&["BVT"]));
        assert!(selection.fallback_tags.is_empty());
    }

    #[test]
    fn test_unmatched_without_defaults_selects_nothing() {
        let selection = mapper("grc").map_files(&files(&["Makefile"]));
        assert!(selection.tags.is_empty());
        assert!(!selection.files[0].matched_rule);
    }

    #[test]
    fn test_excluded_tag_is_dropped() {
        let catalog = Catalog::parse(
            r#"
[[component]]
name = "hub"
repo_keywords = ["hub"]
test_repo = "https://example.com/hub.git"
test_file_suffixes = ["_test.go"]
jenkins_job = "hub"
excluded_tags = ["e2e"]

[[component.rule]]
pattern = "test/"
tags = ["e2e", "smoke"]
"#,
        )
        .unwrap();
        let m = TagMapper::new(&catalog.components[0]).unwrap();
        let selection = m.map_files(&files(&["test/e2e/hub_test.go"]));
        assert_eq!(selection.tags, tags(&["smoke"]));
    }
}
