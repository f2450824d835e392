//! Failure classification against a component runbook.

pub mod console;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::runbook::{Category, RunbookEntry};

/// One failed test case pulled out of a Jenkins build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedCase {
    /// Polarion case ID (`RHACM4K-1234`) when the test name carries one.
    pub case_id: Option<String>,
    pub name: String,
    pub error_message: String,
    pub excerpt: String,
}

/// How competing runbook matches are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    /// The first matching runbook entry decides.
    #[default]
    FirstMatch,
    /// The category with the most matching entries decides.
    Majority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Classified(Category),
    Unclassified,
}

impl Verdict {
    pub fn suggestion(&self) -> &'static str {
        match self {
            Verdict::Classified(Category::AutomationBug) => "Re-run the case.",
            Verdict::Classified(Category::SystemIssue) => {
                "Check the test environment, then re-run the case."
            }
            Verdict::Classified(Category::ProductBug) => "Investigate further and raise a product issue.",
            Verdict::Unclassified => "No runbook keyword matched; review manually.",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Verdict::Classified(Category::ProductBug) => "product",
            Verdict::Classified(Category::AutomationBug) => "automation",
            Verdict::Classified(Category::SystemIssue) => "system",
            Verdict::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Classified(category) => category.fmt(f),
            Verdict::Unclassified => f.write_str("Unclassified"),
        }
    }
}

/// Classification outcome for a single failed case.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub case: FailedCase,
    pub verdict: Verdict,
    pub matched_keyword: Option<String>,
}

pub struct Classifier<'a> {
    entries: &'a [RunbookEntry],
    strategy: Strategy,
}

impl<'a> Classifier<'a> {
    pub fn new(entries: &'a [RunbookEntry], strategy: Strategy) -> Self {
        Self { entries, strategy }
    }

    pub fn classify(&self, case: &FailedCase) -> FailureRecord {
        let haystack = format!("{}\n{}\n{}", case.name, case.error_message, case.excerpt).to_lowercase();
        let matched = match self.strategy {
            Strategy::FirstMatch => self.first_match(&haystack),
            Strategy::Majority => self.majority(&haystack),
        };

        let (verdict, matched_keyword) = match matched {
            Some(entry) => (Verdict::Classified(entry.category), Some(entry.keyword.clone())),
            None => (Verdict::Unclassified, None),
        };

        tracing::debug!(
            case = %case.name,
            verdict = %verdict,
            keyword = matched_keyword.as_deref().unwrap_or("-"),
            "Classified failure"
        );

        FailureRecord {
            case: case.clone(),
            verdict,
            matched_keyword,
        }
    }

    pub fn classify_all(&self, cases: &[FailedCase]) -> Vec<FailureRecord> {
        cases.iter().map(|c| self.classify(c)).collect()
    }

    fn first_match(&self, haystack: &str) -> Option<&'a RunbookEntry> {
        self.entries.iter().find(|e| e.pattern.is_match(haystack))
    }

    /// Returns the earliest matching entry of the winning category.
    fn majority(&self, haystack: &str) -> Option<&'a RunbookEntry> {
        // category -> (count, first matching entry)
        let mut tally: BTreeMap<Category, (usize, usize)> = BTreeMap::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.pattern.is_match(haystack) {
                tally
                    .entry(entry.category)
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, idx));
            }
        }

        tally
            .into_values()
            .max_by(|(count_a, first_a), (count_b, first_b)| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(_, first)| &self.entries[first])
    }
}

/// Per-verdict counts for a classification run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub product_bugs: usize,
    pub automation_bugs: usize,
    pub system_issues: usize,
    pub unclassified: usize,
}

impl Summary {
    pub fn from_records(records: &[FailureRecord]) -> Self {
        let mut summary = Summary {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            match record.verdict {
                Verdict::Classified(Category::ProductBug) => summary.product_bugs += 1,
                Verdict::Classified(Category::AutomationBug) => summary.automation_bugs += 1,
                Verdict::Classified(Category::SystemIssue) => summary.system_issues += 1,
                Verdict::Unclassified => summary.unclassified += 1,
            }
        }
        summary
    }
}

/// Component name from a Jenkins job URL: the last `job/<name>` segment up to
/// its first `-` or `_`, e.g. `.../job/grc-e2e-test-execution/2532/` and
/// `.../job/alc_e2e_tests/9/` give `grc` and `alc`.
pub fn component_from_job_url(url: &str) -> Option<String> {
    let path = match url.find("://") {
        Some(idx) => {
            let after_scheme = &url[idx + 3..];
            after_scheme.find('/').map(|p| &after_scheme[p..]).unwrap_or("")
        }
        None => url,
    };
    let path = path.split(['?', '#']).next().unwrap_or("");
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

    let last_job = parts
        .windows(2)
        .filter(|w| w[0] == "job")
        .map(|w| w[1])
        .last()?;

    let component = last_job.split(['-', '_']).next().unwrap_or(last_job);
    if component.is_empty() {
        None
    } else {
        Some(component.to_lowercase())
    }
}
