use std::sync::LazyLock;

use regex::Regex;

use super::TestCase;

static GINKGO_DESCRIBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ginkgo\.Describe\("([^"]+)",\s*ginkgo\.Label\(([^)]+)\)"#).expect("static regex")
});
static GINKGO_IT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"It\("(RHACM4K-\d+:[^"]+)""#).expect("static regex"));

static CYPRESS_DESCRIBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"describe\s*\(\s*["']([^"']+)["']\s*,\s*\{\s*tags:\s*\[([^\]]+)\]\s*\}"#)
        .expect("static regex")
});
static CYPRESS_IT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bit\s*\(\s*['"]([^'"]*RHACM4K-(\d+)[^'"]*)['"](?:\s*,\s*\{\s*tags:\s*\[([^\]]+)\]\s*\})?"#,
    )
    .expect("static regex")
});
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("static regex"));

static SPEC_DESCRIBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"describe\s*\(\s*["']([^"']+)["']\s*,\s*\{\s*tags:\s*(tags\.\w+)\s*\}"#)
        .expect("static regex")
});
static SPEC_IT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bit\s*\(\s*['"]([^'"]*(?:RHACM4K|P\d|Sev\d)[^'"]*)['"]"#)
        .expect("static regex")
});

/// Cypress tags that mark how a test runs rather than what it covers.
const GENERIC_TAGS: &[&str] = &["non-ui", "uitest", "ui"];

/// Search suites reference shared tag lists instead of literals.
fn spec_tag_list(reference: &str) -> &'static [&'static str] {
    match reference {
        "tags.env" => &["CANARY", "ROSA"],
        "tags.modes" => &["BVT", "SVT"],
        "tags.required" => &["REQUIRED"],
        _ => &[],
    }
}

/// Extract tagged test cases from one test source file, chosen by file suffix.
pub fn extract_tests(rel_path: &str, content: &str) -> Vec<TestCase> {
    if rel_path.ends_with("_test.go") {
        extract_ginkgo(rel_path, content)
    } else if rel_path.ends_with(".cy.js") {
        extract_cypress(rel_path, content)
    } else if rel_path.ends_with(".spec.js") {
        extract_spec(rel_path, content)
    } else {
        Vec::new()
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// `ginkgo.Describe("suite", ginkgo.Label("a", "b"), ...)` with
/// `It("RHACM4K-<n>: ...")` specs inheriting the labels.
fn extract_ginkgo(rel_path: &str, content: &str) -> Vec<TestCase> {
    let Some(describe) = GINKGO_DESCRIBE.captures(content) else {
        return Vec::new();
    };
    let suite = describe[1].to_string();

    let mut labels = Vec::new();
    for label in describe[2].split(',') {
        push_unique(&mut labels, label.trim().trim_matches(|c: char| c == '"' || c == '\''));
    }

    GINKGO_IT
        .captures_iter(content)
        .map(|c| TestCase {
            name: c[1].to_string(),
            suite: suite.clone(),
            file: rel_path.to_string(),
            tags: labels.clone(),
        })
        .collect()
}

/// `describe('suite', { tags: ['@a'] }, ...)` with
/// `it('RHACM4K-<n>: ...', { tags: ['@b'] }, ...)`. Each test also gets its
/// case number as a tag.
fn extract_cypress(rel_path: &str, content: &str) -> Vec<TestCase> {
    let Some(describe) = CYPRESS_DESCRIBE.captures(content) else {
        return Vec::new();
    };
    let suite = describe[1].to_string();
    let describe_tags: Vec<String> = QUOTED
        .captures_iter(&describe[2])
        .map(|c| c[1].trim_start_matches('@').to_string())
        .filter(|t| !t.is_empty())
        .collect();

    CYPRESS_IT
        .captures_iter(content)
        .map(|c| {
            let it_tags = c
                .get(3)
                .map(|m| {
                    QUOTED
                        .captures_iter(m.as_str())
                        .map(|q| q[1].trim_start_matches('@').to_string())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            let mut tags = Vec::new();
            for tag in describe_tags.iter().chain(it_tags.iter()) {
                if !GENERIC_TAGS.contains(&tag.as_str()) {
                    push_unique(&mut tags, tag);
                }
            }
            push_unique(&mut tags, &c[2]);

            TestCase {
                name: c[1].to_string(),
                suite: suite.clone(),
                file: rel_path.to_string(),
                tags,
            }
        })
        .collect()
}

/// `describe('suite', { tags: tags.modes }, ...)`. Tests belong to the
/// describe block that precedes them.
fn extract_spec(rel_path: &str, content: &str) -> Vec<TestCase> {
    let describes: Vec<(usize, String, &'static [&'static str])> = SPEC_DESCRIBE
        .captures_iter(content)
        .filter_map(|c| {
            let start = c.get(0)?.start();
            Some((start, c[1].to_string(), spec_tag_list(&c[2])))
        })
        .collect();

    let mut tests = Vec::new();
    for (i, (start, suite, labels)) in describes.iter().enumerate() {
        let end = describes
            .get(i + 1)
            .map(|(next, _, _)| *next)
            .unwrap_or(content.len());
        let body = &content[*start..end];

        for c in SPEC_IT.captures_iter(body) {
            tests.push(TestCase {
                name: c[1].to_string(),
                suite: suite.clone(),
                file: rel_path.to_string(),
                tags: labels.iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    tests
}
