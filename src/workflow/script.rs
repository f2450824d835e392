use crate::ai::{prompt, ChatClient};
use crate::classify::console::case_id;
use crate::config::AppConfig;
use crate::error::Result;
use crate::polarion::{PolarionClient, TestStep};

/// What to generate a test script for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptInput {
    /// A Polarion test case (`RHACM4K-<n>`).
    Case(String),
    /// A free-text feature description, one step per line.
    Description(String),
}

impl ScriptInput {
    /// A bare case ID is looked up in Polarion; anything else is a description.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match case_id(trimmed) {
            Some(id) if id.eq_ignore_ascii_case(trimmed) || trimmed.replace('_', "-").eq_ignore_ascii_case(&id) => {
                ScriptInput::Case(id)
            }
            _ => ScriptInput::Description(trimmed.to_string()),
        }
    }
}

fn description_steps(text: &str) -> (String, Vec<TestStep>) {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let title = lines.next().unwrap_or_default().to_string();
    let mut steps: Vec<TestStep> = lines
        .map(|l| TestStep {
            step: l.to_string(),
            expected: String::new(),
        })
        .collect();
    if steps.is_empty() {
        steps.push(TestStep {
            step: title.clone(),
            expected: String::new(),
        });
    }
    (title, steps)
}

/// Generated test code, as returned by the model.
pub async fn run(config: &AppConfig, input: &ScriptInput) -> Result<String> {
    let (title, steps) = match input {
        ScriptInput::Case(id) => {
            let polarion = PolarionClient::new(&config.polarion)?;
            let case = polarion.get_test_case(id).await?;
            (format!("{}: {}", case.id, case.title), case.steps)
        }
        ScriptInput::Description(text) => description_steps(text),
    };

    let client = ChatClient::new(&config.model)?;
    tracing::info!(title = %title, steps = steps.len(), model = %client.model(), "Generating test script");
    client.ask(prompt::test_script(&title, &steps)).await
}
