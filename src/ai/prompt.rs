use crate::classify::{FailureRecord, Verdict};
use crate::polarion::TestStep;
use crate::runbook::Category;

const UI_KEYWORDS: &[&str] = &["policy", "page", "browser"];

/// Sent ahead of every request.
pub const SYSTEM: &str = "You are a QE assistant for Red Hat Advanced Cluster Management. \
Base every conclusion on the logs, runbook rules and test steps you are given, and say so when they are not enough.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Cypress,
    Ginkgo,
}

impl Framework {
    /// Cypress when any step mentions a UI keyword, Ginkgo otherwise.
    pub fn for_steps(steps: &[TestStep]) -> Self {
        let ui = steps.iter().any(|s| {
            let step = s.step.to_lowercase();
            UI_KEYWORDS.iter().any(|k| step.contains(k))
        });
        if ui {
            Framework::Cypress
        } else {
            Framework::Ginkgo
        }
    }

    fn name(self) -> &'static str {
        match self {
            Framework::Cypress => "cypress",
            Framework::Ginkgo => "ginkgo",
        }
    }

    fn language(self) -> &'static str {
        match self {
            Framework::Cypress => "JavaScript",
            Framework::Ginkgo => "Go",
        }
    }

    fn persona(self) -> &'static str {
        match self {
            Framework::Cypress => "You are a QA automation engineer experienced with Cypress, the JavaScript end-to-end testing framework.",
            Framework::Ginkgo => "You are a QA automation engineer experienced with Ginkgo, the BDD testing framework for Go.",
        }
    }

    fn style_guide(self) -> &'static str {
        match self {
            Framework::Cypress => "Write realistic Cypress test code using JavaScript to automate browser interactions and validate UI behavior.",
            Framework::Ginkgo => "Write clean and idiomatic Go code using Ginkgo for BDD-style testing. Use Gomega for assertions.",
        }
    }
}

pub fn failure_analysis(component: &str, guidelines: &str, records: &[FailureRecord]) -> String {
    let cases = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "### Case {n}\n- Case ID: {id}\n- Case Title: {title}\n- Assert Reason: {error}\n- Runbook verdict: {verdict}{keyword}\n",
                n = i + 1,
                id = r.case.case_id.as_deref().unwrap_or("unknown"),
                title = r.case.name,
                error = if r.case.error_message.is_empty() {
                    r.case.excerpt.lines().next().unwrap_or_default()
                } else {
                    r.case.error_message.as_str()
                },
                verdict = r.verdict,
                keyword = r
                    .matched_keyword
                    .as_deref()
                    .map(|k| format!(" (matched `{k}`)"))
                    .unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let automation = Verdict::Classified(Category::AutomationBug).suggestion();
    let system = Verdict::Classified(Category::SystemIssue).suggestion();
    let product = Verdict::Classified(Category::ProductBug).suggestion();

    format!(
        r#"You are a QE engineer triaging failed automated tests for the `{component}` component.

## Analysis Guidelines
{guidelines_section}

## Failed Cases
{cases}

## Output
Produce a markdown report:

#### Test Failure Analysis Report

**Analysis summary**
- Total cases: {total}

**Detailed analysis**
Based on the component and the guidelines, decide the most likely failure type for each case
(Product bug, Automation bug or System issue). The runbook verdict is a keyword match; confirm
or correct it. Present the results as a table:

| Case ID | Case Title | Failure Type | Assert Reason | Suggestion |
|---------|------------|--------------|---------------|------------|

Suggestions:
- Automation bug: {automation}
- System issue: {system}
- Product bug: {product}"#,
        guidelines_section = if guidelines.trim().is_empty() {
            "No component guidelines are available; rely on the error messages.".to_string()
        } else {
            guidelines.trim().to_string()
        },
        total = records.len(),
    )
}

pub fn test_script(title: &str, steps: &[TestStep]) -> String {
    let framework = Framework::for_steps(steps);
    let name = framework.name();

    let feature = steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.expected.is_empty() {
                format!("{}. {}", i + 1, s.step)
            } else {
                format!("{}. {}\n   Expected: {}", i + 1, s.step, s.expected)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{persona}
Please generate an automated test script using **{name}** for the following feature. Follow the standard practices and style conventions of the {name} framework.

### Feature: {title}
{feature}

### Requirements:
- Use {language} for writing the test script
- Use the {name} framework
- {style_guide}
- Follow best practices for structuring tests
- Use mocks or stubs as needed
- Add comments to explain each step
- Return only the test code inside a markdown code block"#,
        persona = framework.persona(),
        language = framework.language(),
        style_guide = framework.style_guide(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FailedCase;

    fn step(text: &str) -> TestStep {
        TestStep {
            step: text.to_string(),
            expected: String::new(),
        }
    }

    #[test]
    fn test_framework_choice() {
        assert_eq!(Framework::for_steps(&[step("Open the Policy page")]), Framework::Cypress);
        assert_eq!(Framework::for_steps(&[step("Launch a browser")]), Framework::Cypress);
        assert_eq!(Framework::for_steps(&[step("Import a managed cluster")]), Framework::Ginkgo);
        assert_eq!(Framework::for_steps(&[]), Framework::Ginkgo);
    }

    #[test]
    fn test_script_prompt_lists_steps() {
        let prompt = test_script(
            "Create policy",
            &[
                step("Log in"),
                TestStep {
                    step: "Create a policy".to_string(),
                    expected: "Policy is compliant".to_string(),
                },
            ],
        );
        assert!(prompt.contains("using **cypress**"));
        assert!(prompt.contains("2. Create a policy\n   Expected: Policy is compliant"));
        assert!(prompt.contains("Use JavaScript"));
    }

    #[test]
    fn test_failure_analysis_prompt() {
        let records = vec![FailureRecord {
            case: FailedCase {
                case_id: Some("RHACM4K-1".to_string()),
                name: "RHACM4K-1: create policy".to_string(),
                error_message: String::new(),
                excerpt: "Timed out retrying after 4000ms\nat cy.get".to_string(),
            },
            verdict: Verdict::Classified(Category::AutomationBug),
            matched_keyword: Some("timed out retrying".to_string()),
        }];
        let prompt = failure_analysis("grc", "", &records);
        assert!(prompt.contains("`grc` component"));
        assert!(prompt.contains("Assert Reason: Timed out retrying after 4000ms\n"));
        assert!(prompt.contains("(matched `timed out retrying`)"));
        assert!(prompt.contains("Total cases: 1"));
        assert!(prompt.contains("No component guidelines"));
    }
}
