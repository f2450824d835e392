use std::collections::{BTreeMap, BTreeSet};

use super::{escape_html, meta_item, page, stat_card};
use crate::platform::types::PullRequest;
use crate::selection::{
    ComponentProfile, Priority, SelectedTest, TagSelection, TagStyle, TestSelection,
};

const SELECTION_STYLE: &str = r#"
        .tag-header { display: flex; align-items: center; margin-bottom: 15px; padding-bottom: 10px; border-bottom: 2px solid #e9ecef; }
        .tag-badge { display: inline-block; background: #3498db; color: white; padding: 8px 16px; border-radius: 20px; font-weight: bold; margin-right: 15px; }
        .tag-count { color: #666; }
        .test-item { padding: 12px; margin-bottom: 8px; background: #f8f9fa; border-left: 4px solid #3498db; border-radius: 4px; font-family: 'Courier New', monospace; font-size: 0.9em; }
        .test-item.should-run { border-left-color: #95a5a6; }
        .notice { background: #fdecea; border: 1px solid #e74c3c; padding: 15px; border-radius: 8px; margin: 20px 0; color: #922b21; }
        .next-steps { background: #fff3cd; border: 1px solid #ffc107; padding: 20px; border-radius: 8px; margin-top: 20px; color: #856404; }
"#;

/// One PR's contribution to a selection.
pub struct PrSummary<'a> {
    pub pr: &'a PullRequest,
    pub tags: &'a TagSelection,
    pub tests: usize,
}

/// Everything a selection report shows.
pub struct SelectionView<'a> {
    pub component: &'a ComponentProfile,
    pub prs: Vec<PrSummary<'a>>,
    /// Union of the PRs' tags.
    pub tags: BTreeSet<String>,
    pub tests: &'a TestSelection,
    pub total_tags: usize,
    /// Tag expression in display form.
    pub expression: String,
    pub test_source: String,
}

impl SelectionView<'_> {
    fn numbered(&self) -> bool {
        self.component.tag_style == TagStyle::Numbered
    }

    /// Numbered components group by test number, others by matched tag.
    fn groups(&self) -> Vec<(String, Vec<&SelectedTest>)> {
        if self.numbered() {
            let mut by_number: BTreeMap<u64, Vec<&SelectedTest>> = BTreeMap::new();
            for t in self.tests.iter() {
                if let Some(n) = t.test.case_number().and_then(|n| n.parse().ok()) {
                    by_number.entry(n).or_default().push(t);
                }
            }
            by_number
                .into_iter()
                .map(|(n, tests)| (format!("@{n}"), tests))
                .collect()
        } else {
            let mut by_tag: BTreeMap<&str, Vec<&SelectedTest>> = BTreeMap::new();
            for t in self.tests.iter() {
                for tag in &t.matched_tags {
                    by_tag.entry(tag.as_str()).or_default().push(t);
                }
            }
            by_tag
                .into_iter()
                .map(|(tag, tests)| (tag.to_string(), tests))
                .collect()
        }
    }

    fn stats(&self, groups: usize) -> String {
        let selected = if self.numbered() { groups } else { self.tags.len() };
        let coverage = if self.total_tags == 0 {
            0
        } else {
            selected * 100 / self.total_tags
        };
        let mut html = String::from("        <div class=\"stats\">\n");
        html.push_str(&stat_card("Total Tags Available", self.total_tags));
        html.push_str(&stat_card("Selected Tags", selected));
        html.push_str(&stat_card("Must Run", self.tests.must_run.len()));
        html.push_str(&stat_card("Should Run", self.tests.should_run.len()));
        html.push_str(&stat_card("Tag Coverage", format!("{coverage}%")));
        html.push_str("        </div>\n");
        html
    }

    fn notices(&self) -> String {
        let mut html = String::new();
        if self.prs.iter().all(|p| p.tags.is_docs_only) {
            html.push_str("        <div class=\"notice\">Documentation-only change: no tests selected.</div>\n");
        } else if self.tags.is_empty() {
            html.push_str("        <div class=\"notice\">No tags matched the changed files; choose tests manually.</div>\n");
        }
        if self.prs.iter().any(|p| p.tags.is_critical) {
            html.push_str("        <div class=\"notice\">Critical paths changed: every selected test is must-run.</div>\n");
        }
        html
    }

    fn test_sections(&self) -> String {
        let groups = self.groups();
        let mut html = format!(
            "        <h2>Test Cases by {}</h2>\n",
            if self.numbered() { "Test Number" } else { "Tag" }
        );
        for (label, tests) in &groups {
            html.push_str(&format!(
                r#"        <div class="card">
            <div class="tag-header"><span class="tag-badge">{}</span><span class="tag-count">{} test case(s)</span></div>
"#,
                escape_html(label),
                tests.len()
            ));
            for t in tests {
                html.push_str(&format!(
                    "            <div class=\"test-item {}\">{} <small>({})</small></div>\n",
                    if t.priority == Priority::MustRun { "must-run" } else { "should-run" },
                    escape_html(&t.test.name),
                    escape_html(&t.test.file)
                ));
            }
            html.push_str("        </div>\n");
        }
        html
    }

    fn next_steps(&self) -> String {
        format!(
            r#"        <div class="next-steps">
            <h3>Next Steps</h3>
            <ol>
                <li>Review the {} selected test cases above</li>
                <li>Trigger Jenkins job <code>{}</code> with tags: <code>{}</code></li>
                <li>Monitor test execution and results</li>
                <li>Update the selection rules if a changed file was not mapped</li>
            </ol>
        </div>
"#,
            self.tests.len(),
            escape_html(&self.component.jenkins_job),
            escape_html(&self.expression)
        )
    }
}

fn pr_link(pr: &PullRequest) -> String {
    format!(
        r#"<a href="{}" target="_blank">#{}</a>"#,
        escape_html(&pr.url),
        pr.pr_ref.number
    )
}

/// Single-PR report.
pub fn selection_report(view: &SelectionView<'_>) -> String {
    let mut body = String::from("        <h1>Tag-Based Test Selection Report</h1>\n");
    body.push_str(&format!(
        "        <p class=\"subtitle\">Tests from {}</p>\n",
        escape_html(&view.test_source)
    ));

    if let Some(summary) = view.prs.first() {
        let pr = summary.pr;
        body.push_str("        <div class=\"card\"><h2>Pull Request Information</h2><div class=\"meta\">\n");
        body.push_str(&meta_item("PR Number", &pr_link(pr)));
        body.push_str(&meta_item("Title", &escape_html(&pr.title)));
        body.push_str(&meta_item("Repository", &escape_html(&pr.pr_ref.full_name())));
        body.push_str(&meta_item("Component", &escape_html(&view.component.name)));
        body.push_str(&meta_item("Author", &escape_html(&pr.author)));
        body.push_str(&meta_item(
            "Files Changed",
            &format!("{} file(s)", pr.changed_files.len()),
        ));
        body.push_str("        </div></div>\n");

        let unmatched: Vec<&str> = summary.tags.unmatched_files().collect();
        if !unmatched.is_empty() {
            body.push_str("        <div class=\"card\"><h2>Files Without a Matching Rule</h2><ul>\n");
            for file in unmatched {
                body.push_str(&format!("            <li><code>{}</code></li>\n", escape_html(file)));
            }
            body.push_str("        </ul></div>\n");
        }
    }

    body.push_str(&view.stats(view.groups().len()));
    body.push_str(&view.notices());
    body.push_str(&view.test_sections());
    body.push_str(&view.next_steps());

    let title = match view.prs.first() {
        Some(p) => format!("PR #{} Test Selection", p.pr.pr_ref.number),
        None => "Test Selection".to_string(),
    };
    page(&title, SELECTION_STYLE, &body)
}

/// Multi-PR report with a per-PR table ahead of the combined selection.
pub fn batch_report(view: &SelectionView<'_>) -> String {
    let mut body = String::from("        <h1>Batch Test Selection Report</h1>\n");
    body.push_str(&format!(
        "        <p class=\"subtitle\">{} pull requests for component {}, tests from {}</p>\n",
        view.prs.len(),
        escape_html(&view.component.name),
        escape_html(&view.test_source)
    ));

    body.push_str(
        r#"        <div class="card"><h2>Pull Requests</h2>
        <table>
            <tr><th>PR</th><th>Title</th><th>Author</th><th>Files</th><th>Tags</th><th>Tests</th></tr>
"#,
    );
    for summary in &view.prs {
        let tags = summary
            .tags
            .tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        body.push_str(&format!(
            "            <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            pr_link(summary.pr),
            escape_html(&summary.pr.title),
            escape_html(&summary.pr.author),
            summary.pr.changed_files.len(),
            escape_html(&tags),
            summary.tests
        ));
    }
    body.push_str("        </table></div>\n");

    body.push_str(&view.stats(view.groups().len()));
    body.push_str(&view.notices());
    body.push_str(&view.test_sections());
    body.push_str(&view.next_steps());

    page(
        &format!("Batch Test Selection ({} PRs)", view.prs.len()),
        SELECTION_STYLE,
        &body,
    )
}
