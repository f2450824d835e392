use super::{escape_html, meta_item, page, stat_card};
use crate::classify::{FailureRecord, Strategy, Summary};

const FAILURE_STYLE: &str = r#"
        .product { color: #c0392b; font-weight: bold; }
        .automation { color: #d35400; font-weight: bold; }
        .system { color: #2980b9; font-weight: bold; }
        .unclassified { color: #7f8c8d; font-weight: bold; }
"#;

pub struct FailureReportMeta {
    pub component: String,
    pub source: String,
    pub strategy: Strategy,
}

pub fn failure_report(
    records: &[FailureRecord],
    meta: &FailureReportMeta,
    ai_analysis: Option<&str>,
) -> String {
    let summary = Summary::from_records(records);
    let mut body = String::new();

    body.push_str("        <h1>Test Failure Analysis Report</h1>\n");
    body.push_str(r#"        <div class="card"><h2>Build</h2><div class="meta">"#);
    body.push('\n');
    body.push_str(&meta_item("Component", &escape_html(&meta.component)));
    body.push_str(&meta_item("Source", &escape_html(&meta.source)));
    body.push_str(&meta_item("Strategy", &format!("{:?}", meta.strategy)));
    body.push_str("        </div></div>\n");

    body.push_str("        <div class=\"stats\">\n");
    body.push_str(&stat_card("Failed Cases", summary.total));
    body.push_str(&stat_card("Product Bugs", summary.product_bugs));
    body.push_str(&stat_card("Automation Bugs", summary.automation_bugs));
    body.push_str(&stat_card("System Issues", summary.system_issues));
    body.push_str(&stat_card("Unclassified", summary.unclassified));
    body.push_str("        </div>\n");

    body.push_str(
        r#"        <table>
            <tr><th>ID</th><th>Title</th><th>Category</th><th>Matched Keyword</th><th>Error</th><th>Suggestion</th></tr>
"#,
    );
    for record in records {
        let error = if record.case.error_message.is_empty() {
            &record.case.excerpt
        } else {
            &record.case.error_message
        };
        body.push_str(&format!(
            r#"            <tr><td>{id}</td><td>{title}</td><td class="{class}">{verdict}</td><td>{keyword}</td><td><pre>{error}</pre></td><td>{suggestion}</td></tr>
"#,
            id = escape_html(record.case.case_id.as_deref().unwrap_or("N/A")),
            title = escape_html(&record.case.name),
            class = record.verdict.css_class(),
            verdict = escape_html(&record.verdict.to_string()),
            keyword = escape_html(record.matched_keyword.as_deref().unwrap_or("")),
            error = escape_html(error),
            suggestion = escape_html(record.verdict.suggestion()),
        ));
    }
    body.push_str("        </table>\n");

    if let Some(analysis) = ai_analysis {
        body.push_str(&format!(
            "        <div class=\"card\"><h2>AI Analysis</h2><pre>{}</pre></div>\n",
            escape_html(analysis)
        ));
    }

    page("Test Failure Analysis Report", FAILURE_STYLE, &body)
}
