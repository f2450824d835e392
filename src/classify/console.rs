//! Splits raw Jenkins console output into individual failed cases.

use std::sync::LazyLock;

use regex::Regex;

use super::FailedCase;

const MAX_EXCERPT_LINES: usize = 40;

static GINKGO_FAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:•\s*)?\[(?:FAIL|FAILED|PANICKED|TIMEDOUT)\]\s+(.+?)\s*$")
        .expect("static regex")
});
/// Ginkgo v2 prints the failure reason indented under the spec.
static GINKGO_REASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+\[(?:FAILED|PANICKED|TIMEDOUT)\]\s+(.+?)\s*$").expect("static regex")
});
/// `[0.512 seconds]`: a v2 header with the spec text on the following lines.
static DURATION_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\d+(?:\.\d+)?\s*seconds?\]$").expect("static regex")
});
static SOURCE_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\S+\.\w+:\d+\s*$").expect("static regex"));
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-{10,}\s*$").expect("static regex"));
static GO_FAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--- FAIL:\s+(\S+)").expect("static regex"));
static MOCHA_FAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+failing\b").expect("static regex"));
static MOCHA_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\)\s+(.+?)\s*$").expect("static regex"));
static END_OF_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:Ran \d+ of \d+ Specs|\d+ passing\b|\d+ pending\b|FAIL!|FAIL(?:\s|$)|PASS$|=== RUN\s|--- (?:PASS|SKIP):|Test Suite Failed|\(Run Finished\))",
    )
    .expect("static regex")
});
static CASE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RHACM4K[-_](\d+)").expect("static regex"));
static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:error|expected|assert|timed out|unexpected|failed)").expect("static regex")
});

/// Normalised `RHACM4K-<n>` ID found anywhere in `text`.
pub fn case_id(text: &str) -> Option<String> {
    CASE_ID
        .captures(text)
        .map(|c| format!("RHACM4K-{}", &c[1]))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Title {
    /// The header line names the case.
    Inline,
    /// Mocha prints the suite on the numbered line and the test title on the next.
    MochaNextLine,
    /// Ginkgo v2: container and spec text follow the header, up to a blank
    /// line or the failure reason. Source locations are skipped.
    GinkgoLines,
}

struct Block {
    name: String,
    title: Title,
    /// Still collecting Ginkgo v2 name lines.
    naming: bool,
    name_parts: Vec<String>,
    reason: Option<String>,
    lines: Vec<String>,
}

impl Block {
    fn new(name: String, title: Title) -> Self {
        Self {
            name,
            naming: title == Title::GinkgoLines,
            title,
            name_parts: Vec::new(),
            reason: None,
            lines: Vec::new(),
        }
    }

    /// Returns false once the excerpt is full.
    fn push_line(&mut self, line: &str) -> bool {
        if self.naming {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.naming = self.name_parts.is_empty();
                return true;
            }
            if !SOURCE_LOCATION.is_match(line) {
                self.name_parts.push(trimmed.to_string());
                return true;
            }
        }
        if self.lines.len() >= MAX_EXCERPT_LINES {
            return false;
        }
        self.lines.push(line.trim_end().to_string());
        true
    }

    fn set_reason(&mut self, line: &str, reason: &str) {
        self.naming = false;
        if self.reason.is_none() {
            self.reason = Some(reason.to_string());
        }
        if self.lines.len() < MAX_EXCERPT_LINES {
            self.lines.push(line.trim_end().to_string());
        }
    }

    fn into_case(mut self) -> FailedCase {
        match self.title {
            Title::MochaNextLine => {
                if let Some(pos) = self.lines.iter().position(|l| !l.trim().is_empty()) {
                    let title = self.lines.remove(pos);
                    let title = title.trim().trim_end_matches(':');
                    self.name = format!("{} {}", self.name, title);
                }
            }
            Title::GinkgoLines if !self.name_parts.is_empty() => {
                self.name = self.name_parts.join(" ");
            }
            _ => {}
        }

        let error_message = self.reason.take().unwrap_or_else(|| {
            self.lines
                .iter()
                .map(|l| l.trim())
                .find(|l| ERROR_LINE.is_match(l))
                .unwrap_or("")
                .to_string()
        });
        let excerpt = self.lines.join("\n");
        FailedCase {
            case_id: case_id(&self.name).or_else(|| case_id(&excerpt)),
            error_message,
            excerpt,
            name: self.name,
        }
    }
}

/// Same failure reported twice: equal case IDs, or equal names when either
/// has no ID.
fn same_failure(a: &FailedCase, b: &FailedCase) -> bool {
    match (&a.case_id, &b.case_id) {
        (Some(x), Some(y)) => x == y,
        _ => a.name == b.name,
    }
}

fn push_case(cases: &mut Vec<FailedCase>, block: Option<Block>) {
    let Some(block) = block else { return };
    let case = block.into_case();
    match cases.iter_mut().find(|c| same_failure(c, &case)) {
        Some(existing) => {
            if case.excerpt.len() > existing.excerpt.len() {
                *existing = case;
            }
        }
        None => cases.push(case),
    }
}

/// Recognised failure blocks, de-duplicated by case ID (or name). When the
/// same failure is reported twice (Ginkgo repeats failures in its summary)
/// the longer excerpt is kept. Order is first appearance.
pub fn split_console(text: &str) -> Vec<FailedCase> {
    let mut cases: Vec<FailedCase> = Vec::new();
    let mut current: Option<Block> = None;
    let mut in_mocha_failures = false;
    // A Ginkgo suite runs inside one `go test` function that also reports `--- FAIL:`.
    let mut saw_ginkgo = false;

    for line in text.lines() {
        if MOCHA_FAILING.is_match(line) {
            push_case(&mut cases, current.take());
            in_mocha_failures = true;
            continue;
        }

        if let Some(block) = current.as_mut() {
            if let Some(reason) = GINKGO_REASON.captures(line) {
                block.set_reason(line, &reason[1]);
                continue;
            }
        }

        let header = GINKGO_FAIL
            .captures(line)
            .map(|c| {
                let name = c[1].to_string();
                saw_ginkgo = true;
                let title = if DURATION_ONLY.is_match(&name) {
                    Title::GinkgoLines
                } else {
                    Title::Inline
                };
                (name, title)
            })
            .or_else(|| {
                (!saw_ginkgo)
                    .then(|| GO_FAIL.captures(line))
                    .flatten()
                    .map(|c| (c[1].to_string(), Title::Inline))
            })
            .or_else(|| {
                in_mocha_failures
                    .then(|| MOCHA_ENTRY.captures(line))
                    .flatten()
                    .map(|c| (c[1].to_string(), Title::MochaNextLine))
            });

        if let Some((name, title)) = header {
            push_case(&mut cases, current.take());
            current = Some(Block::new(name, title));
            continue;
        }

        if END_OF_RUN.is_match(line) || SEPARATOR.is_match(line) {
            push_case(&mut cases, current.take());
            if END_OF_RUN.is_match(line) {
                in_mocha_failures = false;
            }
            continue;
        }

        if let Some(block) = current.as_mut() {
            if !block.push_line(line) {
                push_case(&mut cases, current.take());
            }
        }
    }
    push_case(&mut cases, current.take());

    tracing::debug!(failures = cases.len(), "Split console output");
    cases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_id_normalises_separator() {
        assert_eq!(case_id("test_RHACM4K_3471_policy"), Some("RHACM4K-3471".to_string()));
        assert_eq!(case_id("RHACM4K-12: title"), Some("RHACM4K-12".to_string()));
        assert_eq!(case_id("no id here"), None);
    }

    #[test]
    fn test_split_ginkgo_output_dedups_summary() {
        let log = "\
Running Suite: Global Hub e2e
• [FAILED] RHACM4K-100: migration completes [migration]
  Expected
      <string>: Pending
  to equal
      <string>: Completed
  In [It] at: /go/src/migration_test.go:88
------------------------------
• [FAILED] RHACM4K-101: kafka events arrive
  Timed out after 300.000s.
Ran 10 of 12 Specs in 900.1 seconds
Summarizing 2 Failures:
  [FAIL] RHACM4K-100: migration completes [migration]
Test Suite Failed
";
        let cases = split_console(log);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id.as_deref(), Some("RHACM4K-100"));
        assert!(cases[0].excerpt.contains("to equal"));
        assert_eq!(cases[0].error_message, "Expected");
        assert_eq!(cases[1].name, "RHACM4K-101: kafka events arrive");
        assert_eq!(cases[1].error_message, "Timed out after 300.000s.");
    }

    #[test]
    fn test_split_mocha_failures() {
        let log = "\
  12 passing (3m)
  2 failing

  1) Governance policy
       RHACM4K-3471: create policy from yaml:
     CypressError: Timed out retrying after 30000ms: cy.click() failed
      at Context.eval (webpack:///./cypress/e2e/policy.cy.js:41:8)

  2) Governance policy
       RHACM4K-3472: delete policy:
     AssertionError: expected 'NonCompliant' to equal 'Compliant'

(Run Finished)
";
        let cases = split_console(log);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "Governance policy RHACM4K-3471: create policy from yaml");
        assert_eq!(cases[0].case_id.as_deref(), Some("RHACM4K-3471"));
        assert!(cases[0].error_message.starts_with("CypressError: Timed out retrying"));
        assert_eq!(cases[1].case_id.as_deref(), Some("RHACM4K-3472"));
    }

    #[test]
    fn test_numbered_lines_outside_failing_section_are_ignored() {
        let log = "Steps:\n  1) install operator\n  2) create hub\nall good\n";
        assert!(split_console(log).is_empty());
    }

    #[test]
    fn test_split_go_test_failures() {
        let log = "=== RUN   TestImport\n--- FAIL: TestImport (2.00s)\n    import_test.go:12: connection refused\nFAIL\n";
        let cases = split_console(log);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "TestImport");
        assert!(cases[0].excerpt.contains("connection refused"));
    }

    #[test]
    fn test_split_ginkgo_v2_output() {
        let log = "\
Running Suite: Global Hub e2e - /go/src/test/e2e
Will run 12 of 12 specs
••••
------------------------------
• [FAILED] [0.512 seconds]
Global Hub migration
/go/src/test/e2e/migration_test.go:20
  RHACM4K-100: migration completes [migration]
  /go/src/test/e2e/migration_test.go:88

  [FAILED] Expected
      <string>: Pending
  to equal
      <string>: Completed
  In [It] at: /go/src/test/e2e/migration_test.go:95 @ 10/16/26 10:02:11.31
------------------------------
••
------------------------------
• [FAILED] [300.001 seconds]
Global Hub kafka transport
/go/src/test/e2e/kafka_test.go:14
  RHACM4K-101: kafka events arrive
  /go/src/test/e2e/kafka_test.go:40

  [FAILED] Timed out after 300.000s.
  Expected
      <bool>: false
  to be true
  In [It] at: /go/src/test/e2e/kafka_test.go:52 @ 10/16/26 10:07:11.90
------------------------------
••••

Summarizing 2 Failures:
  [FAIL] Global Hub migration [It] RHACM4K-100: migration completes [migration]
  /go/src/test/e2e/migration_test.go:88
  [FAIL] Global Hub kafka transport [It] RHACM4K-101: kafka events arrive
  /go/src/test/e2e/kafka_test.go:40

Ran 12 of 12 Specs in 301.2 seconds
FAIL! -- 10 Passed | 2 Failed | 0 Pending | 0 Skipped
--- FAIL: TestE2e (301.25s)
FAIL
";
        let cases = split_console(log);
        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Global Hub migration RHACM4K-100: migration completes [migration]",
                "Global Hub kafka transport RHACM4K-101: kafka events arrive",
            ]
        );

        assert_eq!(cases[0].case_id.as_deref(), Some("RHACM4K-100"));
        assert_eq!(cases[0].error_message, "Expected");
        assert!(cases[0].excerpt.contains("<string>: Completed"));
        assert!(!cases[0].excerpt.contains("kafka"));

        assert_eq!(cases[1].case_id.as_deref(), Some("RHACM4K-101"));
        assert_eq!(cases[1].error_message, "Timed out after 300.000s.");
        assert!(cases[1].excerpt.contains("to be true"));
    }

    #[test]
    fn test_go_fail_summary_ends_block() {
        let log = "\
=== RUN   TestFoo
--- FAIL: TestFoo (0.01s)
    foo_test.go:14: expected 2 managed clusters, got 1
FAIL
FAIL\tgithub.com/stolostron/clc/pkg/foo\t0.214s
=== RUN   TestOtherImport
    other_test.go:30: dial tcp 10.0.0.4:6443: connection refused
--- PASS: TestOtherImport (3.00s)
ok  \tgithub.com/stolostron/clc/pkg/other\t3.1s
";
        let cases = split_console(log);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "TestFoo");
        assert_eq!(cases[0].excerpt, "    foo_test.go:14: expected 2 managed clusters, got 1");
        assert!(!cases[0].excerpt.contains("connection refused"));
    }

    #[test]
    fn test_distinct_failures_sharing_a_name_are_kept() {
        let log = "\
[FAIL] policy status
  RHACM4K-7 expected Compliant
------------------------------
[FAIL] policy status
  RHACM4K-8 expected NonCompliant
------------------------------
[FAIL] policy status
  RHACM4K-8 expected NonCompliant, retried once
";
        let cases = split_console(log);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id.as_deref(), Some("RHACM4K-7"));
        assert_eq!(cases[1].case_id.as_deref(), Some("RHACM4K-8"));
        assert!(cases[1].excerpt.ends_with("retried once"));
    }
}
