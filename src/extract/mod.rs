//! Test case and tag extraction from a cloned test repository.

mod parsers;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

pub use parsers::extract_tests;

/// A test case declared in test source, with the tags it runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub suite: String,
    pub file: String,
    pub tags: Vec<String>,
}

impl TestCase {
    /// Numeric part of the `RHACM4K-<n>` ID in the test name.
    pub fn case_number(&self) -> Option<String> {
        crate::classify::console::case_id(&self.name)
            .and_then(|id| id.strip_prefix("RHACM4K-").map(str::to_string))
    }
}

/// Tag to declared tests, built from a test repository.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    by_tag: BTreeMap<String, Vec<TestCase>>,
    files_scanned: usize,
}

impl TagIndex {
    /// Walk `root` and index every file whose name ends with one of `suffixes`.
    pub fn scan(root: &Path, suffixes: &[String]) -> Self {
        let mut index = TagIndex::default();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git" && e.file_name() != "node_modules")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy();
            if !suffixes.iter().any(|s| file_name.ends_with(s.as_str())) {
                continue;
            }

            let rel_path = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            let content = match std::fs::read(path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::warn!(file = %rel_path, error = %e, "Skipping unreadable test file");
                    continue;
                }
            };

            index.files_scanned += 1;
            for test in extract_tests(&rel_path, &content) {
                index.insert(test);
            }
        }

        tracing::info!(
            files = index.files_scanned,
            tags = index.tag_count(),
            tests = index.test_count(),
            "Indexed test repository"
        );
        index
    }

    pub fn from_tests(tests: impl IntoIterator<Item = TestCase>) -> Self {
        let mut index = TagIndex::default();
        for test in tests {
            index.insert(test);
        }
        index
    }

    fn insert(&mut self, test: TestCase) {
        for tag in &test.tags {
            self.by_tag.entry(tag.clone()).or_default().push(test.clone());
        }
    }

    pub fn tests_for(&self, tag: &str) -> &[TestCase] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    /// Test-tag pairs, so a test with two tags counts twice.
    pub fn test_count(&self) -> usize {
        self.by_tag.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_indexes_matching_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let e2e = tmp.path().join("cypress/e2e");
        fs::create_dir_all(&e2e).unwrap();
        fs::write(
            e2e.join("policy.cy.js"),
            r#"describe('Policy', { tags: ['@api'] }, () => {
  it('RHACM4K-1: create', () => {})
})"#,
        )
        .unwrap();
        fs::write(e2e.join("helpers.js"), "it('RHACM4K-2: not a test file', () => {})").unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/pkg")).unwrap();
        fs::write(
            tmp.path().join("node_modules/pkg/vendored.cy.js"),
            "describe('V', { tags: ['@api'] }, () => { it('RHACM4K-9: v', () => {}) })",
        )
        .unwrap();

        let index = TagIndex::scan(tmp.path(), &[".cy.js".to_string()]);
        let api = index.tests_for("api");
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].file, "cypress/e2e/policy.cy.js");
        assert_eq!(index.tests_for("1").len(), 1);
        assert_eq!(index.tag_count(), 2);
    }

    #[test]
    fn test_case_number() {
        let test = TestCase {
            name: "RHACM4K-3471: create policy".to_string(),
            suite: "Policy".to_string(),
            file: "policy.cy.js".to_string(),
            tags: vec![],
        };
        assert_eq!(test.case_number().as_deref(), Some("3471"));
    }
}
