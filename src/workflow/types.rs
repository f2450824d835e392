use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::classify::{FailureRecord, Summary};
use crate::jenkins::QueuedBuild;
use crate::selection::TestSelection;

/// Outcome of a classification run.
#[derive(Debug)]
pub struct ClassifyOutcome {
    pub component: String,
    pub records: Vec<FailureRecord>,
    pub summary: Summary,
    pub report_path: PathBuf,
    pub analysis: Option<String>,
}

/// Outcome of a selection run, single or batch.
#[derive(Debug)]
pub struct SelectionOutcome {
    pub component: String,
    pub pr_count: usize,
    pub tags: BTreeSet<String>,
    pub tests: TestSelection,
    pub total_tags: usize,
    /// `TEST_TAGS` value as sent to Jenkins.
    pub expression: String,
    pub docs_only: bool,
    pub report_path: PathBuf,
    pub test_list_path: PathBuf,
    pub queued: Option<QueuedBuild>,
}
