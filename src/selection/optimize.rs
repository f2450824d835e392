use std::collections::{BTreeMap, BTreeSet};

use super::catalog::{ComponentProfile, TagStyle};
use super::mapper::TagSelection;
use super::select::SelectedTest;

fn is_number(tag: &str) -> bool {
    !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_digit())
}

/// Collapse per-test number tags into functional tags where one covers enough
/// tests.
///
/// A functional tag is used only when it covers at least `min_tests_per_tag`
/// tests that no earlier chosen tag covers. Tests left uncovered are listed by
/// number. Returns functional tags alphabetically, then numbers ascending.
pub fn optimize_tags(tests: &[SelectedTest], min_tests_per_tag: usize) -> Vec<String> {
    let mut coverage: BTreeMap<&str, BTreeSet<u64>> = BTreeMap::new();
    let mut numbers = BTreeSet::new();

    for selected in tests {
        let Some(number) = selected.test.case_number().and_then(|n| n.parse::<u64>().ok()) else {
            continue;
        };
        numbers.insert(number);
        for tag in selected.test.tags.iter().filter(|t| !is_number(t)) {
            coverage.entry(tag.as_str()).or_default().insert(number);
        }
    }

    let mut ranked: Vec<(&str, BTreeSet<u64>)> = coverage.into_iter().collect();
    // Stable sort keeps alphabetical order among equal coverage.
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut functional = BTreeSet::new();
    let mut covered = BTreeSet::new();
    for (tag, covers) in ranked {
        if covers.len() < min_tests_per_tag {
            continue;
        }
        let uncovered = covers.difference(&covered).count();
        if uncovered >= min_tests_per_tag {
            tracing::info!(tag = %tag, covers = covers.len(), "Using functional tag");
            functional.insert(tag.to_string());
            covered.extend(covers);
        }
    }

    let remaining: Vec<u64> = numbers.difference(&covered).copied().collect();
    tracing::info!(
        tests = numbers.len(),
        functional = functional.len(),
        numbers = remaining.len(),
        "Optimized tag expression"
    );

    functional
        .into_iter()
        .chain(remaining.into_iter().map(|n| n.to_string()))
        .collect()
}

/// Tag terms the component's Jenkins job filters on.
pub fn expression_terms(
    profile: &ComponentProfile,
    selection: &TagSelection,
    tests: &[SelectedTest],
    min_tests_per_tag: usize,
) -> Vec<String> {
    match profile.tag_style {
        TagStyle::Numbered if !tests.is_empty() => optimize_tags(tests, min_tests_per_tag)
            .into_iter()
            .map(|t| format!("@{t}"))
            .collect(),
        _ => selection.tags.iter().cloned().collect(),
    }
}

/// The `TEST_TAGS` value: terms joined with `||`.
pub fn tag_expression(
    profile: &ComponentProfile,
    selection: &TagSelection,
    tests: &[SelectedTest],
    min_tests_per_tag: usize,
) -> String {
    expression_terms(profile, selection, tests, min_tests_per_tag).join("||")
}

/// Human-readable form of the expression for reports.
pub fn display_expression(terms: &[String]) -> String {
    terms.join(" || ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TestCase;
    use crate::selection::catalog::Catalog;
    use crate::selection::select::Priority;

    fn selected(number: u32, tags: &[&str]) -> SelectedTest {
        let mut all: Vec<String> = tags.iter().map(|s| s.to_string()).collect();
        all.push(number.to_string());
        SelectedTest {
            test: TestCase {
                name: format!("RHACM4K-{number}: case {number}"),
                suite: "GRC".to_string(),
                file: "grc.cy.js".to_string(),
                tags: all,
            },
            matched_tags: vec![],
            score: 3,
            priority: Priority::MustRun,
        }
    }

    #[test]
    fn test_functional_tag_replaces_numbers_at_threshold() {
        let mut tests: Vec<SelectedTest> = (1..=5).map(|n| selected(n, &["zstream"])).collect();
        tests.push(selected(42, &["policyset"]));
        tests.push(selected(7, &[]));

        let tags = optimize_tags(&tests, 5);
        assert_eq!(tags, vec!["zstream", "7", "42"]);
    }

    #[test]
    fn test_below_threshold_lists_numbers() {
        let tests: Vec<SelectedTest> = (10..14).map(|n| selected(n, &["zstream"])).collect();
        assert_eq!(optimize_tags(&tests, 5), vec!["10", "11", "12", "13"]);
    }

    #[test]
    fn test_overlapping_tag_needs_new_coverage() {
        // "api" covers the same five tests as "zstream" plus one; after
        // "api" is chosen, "zstream" adds nothing new.
        let mut tests: Vec<SelectedTest> =
            (1..=5).map(|n| selected(n, &["api", "zstream"])).collect();
        tests.push(selected(6, &["api"]));
        assert_eq!(optimize_tags(&tests, 5), vec!["api"]);
    }

    #[test]
    fn test_expression_by_tag_style() {
        let catalog = Catalog::builtin().unwrap();
        let grc = catalog.get("grc").unwrap();
        let hub = catalog.get("global-hub").unwrap();

        let selection = TagSelection {
            tags: ["migration", "kafka"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        assert_eq!(tag_expression(hub, &selection, &[], 5), "kafka||migration");

        let tests = vec![selected(3471, &["zstream"]), selected(3472, &["zstream"])];
        assert_eq!(tag_expression(grc, &selection, &tests, 5), "@3471||@3472");

        let terms = expression_terms(grc, &selection, &tests, 5);
        assert_eq!(display_expression(&terms), "@3471 || @3472");
    }
}
