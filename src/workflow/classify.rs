use std::path::PathBuf;

use crate::ai::{prompt, ChatClient};
use crate::classify::{component_from_job_url, console, Classifier, FailedCase, Strategy, Summary};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::jenkins::{build_url, JenkinsClient};
use crate::report::{failure_report, write_artifact, FailureReportMeta};
use crate::runbook::Runbook;
use crate::workflow::types::ClassifyOutcome;

/// Where the failures come from.
#[derive(Debug, Clone)]
pub enum FailureSource {
    /// A Jenkins build URL (any page of the build).
    Build(String),
    /// A saved console log.
    LogFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub source: FailureSource,
    /// Overrides the component derived from the job URL.
    pub component: Option<String>,
    pub strategy: Strategy,
    pub analyze: bool,
    pub output_dir: Option<PathBuf>,
}

pub async fn run(config: &AppConfig, request: &ClassifyRequest) -> Result<ClassifyOutcome> {
    let runbook = Runbook::load(&config.runbook.path)?;

    let component = match (&request.component, &request.source) {
        (Some(c), _) => c.to_lowercase(),
        (None, FailureSource::Build(url)) => component_from_job_url(url).ok_or_else(|| {
            AppError::InvalidInput(format!("Cannot derive a component from {url}; pass --component"))
        })?,
        (None, FailureSource::LogFile(_)) => {
            return Err(AppError::InvalidInput(
                "--component is required when classifying a log file".to_string(),
            ))
        }
    };

    if !runbook.contains(&component) {
        tracing::warn!(
            component = %component,
            known = %runbook.components().collect::<Vec<_>>().join(", "),
            "Runbook has no section for component, every failure will be unclassified"
        );
    }

    let (cases, source) = collect_failures(config, &request.source).await?;
    tracing::info!(component = %component, failures = cases.len(), "Collected failed cases");

    let classifier = Classifier::new(runbook.entries(&component), request.strategy);
    let records = classifier.classify_all(&cases);
    let summary = Summary::from_records(&records);
    tracing::info!(
        total = summary.total,
        product = summary.product_bugs,
        automation = summary.automation_bugs,
        system = summary.system_issues,
        unclassified = summary.unclassified,
        "Classification complete"
    );

    let analysis = if request.analyze && !records.is_empty() {
        let client = ChatClient::new(&config.model)?;
        let prompt = prompt::failure_analysis(&component, runbook.guidelines(&component), &records);
        Some(client.ask(prompt).await?)
    } else {
        None
    };

    let meta = FailureReportMeta {
        component: component.clone(),
        source,
        strategy: request.strategy,
    };
    let html = failure_report(&records, &meta, analysis.as_deref());
    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| config.selection.output_dir.clone());
    let report_path =
        write_artifact(&output_dir, &format!("failure-analysis-{component}.html"), &html).await?;

    Ok(ClassifyOutcome {
        component,
        records,
        summary,
        report_path,
        analysis,
    })
}

/// Failed cases plus a description of where they came from.
async fn collect_failures(
    config: &AppConfig,
    source: &FailureSource,
) -> Result<(Vec<FailedCase>, String)> {
    match source {
        FailureSource::LogFile(path) => {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                AppError::InvalidInput(format!("Failed to read log {}: {e}", path.display()))
            })?;
            Ok((console::split_console(&text), path.display().to_string()))
        }
        FailureSource::Build(url) => {
            let build = build_url(url)?;
            let client = JenkinsClient::new(&config.jenkins)?;

            match client.fetch_failed_cases(&build).await? {
                Some(cases) if !cases.is_empty() => Ok((cases, build)),
                _ => {
                    tracing::info!(build = %build, "Falling back to console log");
                    let text = client.fetch_console(&build).await?;
                    Ok((console::split_console(&text), build))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNBOOK: &str = r#"
## Component Name grc

| Category | Keywords |
|---|---|
| Automation bug | `Timed out retrying` |
| Product bug | `policy is NonCompliant` |
"#;

    fn config(dir: &std::path::Path, jenkins: Option<String>) -> AppConfig {
        let runbook = dir.join("runbook.md");
        std::fs::write(&runbook, RUNBOOK).unwrap();
        let mut config = AppConfig::default();
        config.runbook.path = runbook;
        config.selection.output_dir = dir.join("out");
        config.jenkins.url = jenkins;
        config
    }

    #[tokio::test]
    async fn test_classify_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("console.log");
        std::fs::write(
            &log,
            "[FAIL] GRC RHACM4K-1: create policy\n  Timed out retrying after 4000ms\nRan 3 of 10 Specs\n",
        )
        .unwrap();

        let request = ClassifyRequest {
            source: FailureSource::LogFile(log),
            component: Some("GRC".to_string()),
            strategy: Strategy::FirstMatch,
            analyze: false,
            output_dir: None,
        };
        let outcome = run(&config(tmp.path(), None), &request).await.unwrap();

        assert_eq!(outcome.component, "grc");
        assert_eq!(outcome.summary.total, 1);
        assert_eq!(outcome.summary.automation_bugs, 1);
        assert!(outcome.report_path.ends_with("failure-analysis-grc.html"));
        assert!(outcome.report_path.exists());
    }

    #[tokio::test]
    async fn test_log_file_requires_component() {
        let tmp = tempfile::tempdir().unwrap();
        let request = ClassifyRequest {
            source: FailureSource::LogFile(tmp.path().join("missing.log")),
            component: None,
            strategy: Strategy::FirstMatch,
            analyze: false,
            output_dir: None,
        };
        let err = run(&config(tmp.path(), None), &request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_build_falls_back_to_console() {
        let mut server = mockito::Server::new_async().await;
        let _report = server
            .mock("GET", "/job/grc-e2e-test-execution/7/testReport/api/json")
            .with_status(404)
            .create_async()
            .await;
        let _console = server
            .mock("GET", "/job/grc-e2e-test-execution/7/consoleText")
            .with_status(200)
            .with_body("[FAIL] RHACM4K-9: status sync\n  expected policy is NonCompliant\n")
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = ClassifyRequest {
            source: FailureSource::Build(format!(
                "{}/job/grc-e2e-test-execution/7/console",
                server.url()
            )),
            component: None,
            strategy: Strategy::Majority,
            analyze: false,
            output_dir: Some(tmp.path().join("reports")),
        };
        let outcome = run(&config(tmp.path(), None), &request).await.unwrap();

        assert_eq!(outcome.component, "grc");
        assert_eq!(outcome.summary.product_bugs, 1);
        assert_eq!(outcome.records[0].case.case_id.as_deref(), Some("RHACM4K-9"));
        assert!(outcome.report_path.starts_with(tmp.path().join("reports")));
    }
}
