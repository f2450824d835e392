use std::collections::HashMap;

use serde::Serialize;

use super::mapper::TagSelection;
use crate::extract::{TagIndex, TestCase};

const CRITICAL_SCORE: u32 = 10;
const DIRECT_SCORE: u32 = 3;
const FALLBACK_SCORE: u32 = 1;
const PROMOTION_SCORE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    MustRun,
    ShouldRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedTest {
    pub test: TestCase,
    pub matched_tags: Vec<String>,
    pub score: u32,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSelection {
    pub must_run: Vec<SelectedTest>,
    pub should_run: Vec<SelectedTest>,
}

impl TestSelection {
    pub fn len(&self) -> usize {
        self.must_run.len() + self.should_run.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Must-run tests first.
    pub fn iter(&self) -> impl Iterator<Item = &SelectedTest> {
        self.must_run.iter().chain(self.should_run.iter())
    }

    /// Append tests from another selection, skipping names already present.
    pub fn merge(&mut self, other: &TestSelection) {
        for selected in other.iter() {
            if self.iter().any(|t| t.test.name == selected.test.name) {
                continue;
            }
            match selected.priority {
                Priority::MustRun => self.must_run.push(selected.clone()),
                Priority::ShouldRun => self.should_run.push(selected.clone()),
            }
        }
    }
}

/// Pick the tests declared under the selected tags.
///
/// Tags are visited in sorted order. A test's first matching tag sets its
/// priority; later matches add to its score, and a should-run test whose score
/// reaches the promotion threshold becomes must-run.
pub fn select_tests(selection: &TagSelection, index: &TagIndex) -> TestSelection {
    let mut picked: Vec<SelectedTest> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for tag in &selection.tags {
        let tests = index.tests_for(tag);
        if tests.is_empty() {
            tracing::info!(tag = %tag, "Tag not declared by any test");
            continue;
        }
        tracing::info!(tag = %tag, tests = tests.len(), critical = selection.is_critical, "Tag matched tests");

        for test in tests {
            if let Some(&idx) = by_name.get(&test.name) {
                let existing = &mut picked[idx];
                if !existing.matched_tags.contains(tag) {
                    existing.matched_tags.push(tag.clone());
                    existing.score += 1;
                }
                if existing.priority == Priority::ShouldRun && existing.score >= PROMOTION_SCORE {
                    existing.priority = Priority::MustRun;
                }
                continue;
            }

            let (score, priority) = if selection.is_critical {
                (CRITICAL_SCORE, Priority::MustRun)
            } else if selection.is_fallback_only(tag) {
                (FALLBACK_SCORE, Priority::ShouldRun)
            } else {
                (DIRECT_SCORE, Priority::MustRun)
            };

            by_name.insert(test.name.clone(), picked.len());
            picked.push(SelectedTest {
                test: test.clone(),
                matched_tags: vec![tag.clone()],
                score,
                priority,
            });
        }
    }

    let (must_run, should_run): (Vec<_>, Vec<_>) = picked
        .into_iter()
        .partition(|t| t.priority == Priority::MustRun);

    tracing::info!(
        must_run = must_run.len(),
        should_run = should_run.len(),
        "Selected tests"
    );

    TestSelection {
        must_run,
        should_run,
    }
}
