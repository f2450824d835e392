//! HTML reports and plain-text test lists.

mod failure;
mod selection;

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::selection::TestSelection;

pub use failure::{failure_report, FailureReportMeta};
pub use selection::{batch_report, selection_report, PrSummary, SelectionView};

const BASE_STYLE: &str = r#"
        body { font-family: 'Segoe UI', Arial, sans-serif; margin: 0; padding: 20px; background: #f0f2f5; }
        .container { max-width: 1400px; margin: 0 auto; }
        h1 { color: #1a1a1a; margin-bottom: 10px; }
        .subtitle { color: #666; margin-bottom: 30px; }
        .card { background: white; padding: 25px; margin-bottom: 20px; border-radius: 10px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
        .card h2 { margin-top: 0; color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
        .meta { display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr)); gap: 15px; margin-top: 15px; }
        .meta-item { padding: 10px; background: #f8f9fa; border-radius: 5px; }
        .meta-label { font-weight: bold; color: #555; font-size: 0.9em; }
        .meta-value { color: #333; margin-top: 5px; }
        .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 20px; margin: 20px 0; }
        .stat-card { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 25px; border-radius: 10px; text-align: center; }
        .stat-card h3 { margin: 0 0 10px 0; font-size: 0.9em; font-weight: normal; }
        .stat-card .value { font-size: 2.5em; font-weight: bold; margin: 0; }
        table { border-collapse: collapse; width: 100%; background: white; }
        th, td { border: 1px solid #dddddd; text-align: left; padding: 8px; vertical-align: top; }
        th { background-color: #f2f2f2; }
        pre { white-space: pre-wrap; margin: 0; font-size: 0.85em; }
        .footer { text-align: center; color: #999; margin-top: 40px; font-size: 0.9em; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, extra_style: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{BASE_STYLE}{extra_style}    </style>
</head>
<body>
    <div class="container">
{body}
        <p class="footer">Generated on {generated}</p>
    </div>
</body>
</html>
"#,
        title = escape_html(title),
        generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

fn stat_card(label: &str, value: impl std::fmt::Display) -> String {
    format!(
        r#"            <div class="stat-card"><h3>{}</h3><div class="value">{}</div></div>
"#,
        escape_html(label),
        escape_html(&value.to_string())
    )
}

fn meta_item(label: &str, value_html: &str) -> String {
    format!(
        r#"                <div class="meta-item"><div class="meta-label">{}</div><div class="meta-value">{value_html}</div></div>
"#,
        escape_html(label)
    )
}

/// One `name<TAB>suite<TAB>file` line per test, must-run first.
pub fn test_list(tests: &TestSelection) -> String {
    tests
        .iter()
        .map(|t| format!("{}\t{}\t{}\n", t.test.name, t.test.suite, t.test.file))
        .collect()
}

/// Write `content` to `dir/name`, creating `dir` as needed.
pub async fn write_artifact(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        AppError::Workspace(format!("Failed to create output dir {}: {e}", dir.display()))
    })?;
    let path = dir.join(name);
    tokio::fs::write(&path, content).await?;
    tracing::info!(path = %path.display(), bytes = content.len(), "Wrote report");
    Ok(path)
}
