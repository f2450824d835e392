use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{Category, Pattern, Runbook, RunbookEntry, Section};
use crate::error::Result;

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("static regex"));

const CATEGORY_HEADERS: &[&str] = &["category", "type", "failure type", "failure category"];
const KEYWORD_HEADERS: &[&str] = &["keyword", "keywords", "pattern", "patterns", "message", "error message"];

/// Placeholder for `\|` inside table cells while splitting on `|`.
const ESCAPED_PIPE: &str = "\u{0}";

enum TableState {
    None,
    /// Header row understood: (category column, keyword column).
    Columns(usize, usize),
    /// A table we do not understand; skipped until it ends.
    Ignored,
}

pub(super) fn parse(text: &str) -> Result<Runbook> {
    let mut sections: BTreeMap<String, Section> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut table = TableState::None;

    for (line_no, line) in text.lines().enumerate() {
        if let Some(name) = section_name(line) {
            table = TableState::None;
            sections.entry(name.clone()).or_insert_with(|| Section {
                guidelines: String::new(),
                entries: Vec::new(),
            });
            current = Some(name);
            continue;
        }

        let Some(component) = current.as_ref() else {
            continue;
        };
        let Some(section) = sections.get_mut(component) else {
            continue;
        };

        section.guidelines.push_str(line);
        section.guidelines.push('\n');

        let trimmed = line.trim();
        if !trimmed.starts_with('|') {
            table = TableState::None;
            continue;
        }

        let cells = split_row(trimmed);
        match table {
            TableState::None => {
                table = header_columns(&cells)
                    .map(|(c, k)| TableState::Columns(c, k))
                    .unwrap_or(TableState::Ignored);
            }
            TableState::Ignored => {}
            TableState::Columns(cat_idx, kw_idx) => {
                if is_separator(&cells) {
                    continue;
                }
                let (Some(cat_cell), Some(kw_cell)) = (cells.get(cat_idx), cells.get(kw_idx)) else {
                    continue;
                };
                let Some(category) = Category::parse(cat_cell) else {
                    tracing::warn!(
                        line = line_no + 1,
                        component = %component,
                        category = %cat_cell,
                        "Skipping runbook row with unknown category"
                    );
                    continue;
                };
                for keyword in keywords(kw_cell) {
                    section.entries.push(RunbookEntry {
                        component: component.clone(),
                        category,
                        pattern: Pattern::parse(&keyword)?,
                        keyword,
                    });
                }
            }
        }
    }

    Ok(Runbook { sections })
}

/// `## Component Name grc` or `## grc`, lower-cased.
fn section_name(line: &str) -> Option<String> {
    let rest = line.strip_prefix("## ")?;
    let rest = rest.trim();
    let name = match rest.get(..14) {
        Some(prefix) if prefix.eq_ignore_ascii_case("component name") => &rest[14..],
        _ => rest,
    };
    let name = name.trim().trim_start_matches(':').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

fn split_row(row: &str) -> Vec<String> {
    let row = row.replace("\\|", ESCAPED_PIPE);
    let inner = row.trim().trim_start_matches('|').trim_end_matches('|');
    inner
        .split('|')
        .map(|c| c.replace(ESCAPED_PIPE, "|").trim().to_string())
        .collect()
}

fn header_columns(cells: &[String]) -> Option<(usize, usize)> {
    let find = |names: &[&str]| {
        cells
            .iter()
            .position(|c| names.contains(&c.trim_matches('*').trim().to_lowercase().as_str()))
    };
    Some((find(CATEGORY_HEADERS)?, find(KEYWORD_HEADERS)?))
}

fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

fn keywords(cell: &str) -> Vec<String> {
    let spans: Vec<String> = CODE_SPAN
        .captures_iter(cell)
        .map(|c| c[1].trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if !spans.is_empty() {
        return spans;
    }
    cell.split("<br>")
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
