use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{job_path, mask_params};
use crate::classify::console::case_id;
use crate::classify::FailedCase;
use crate::config::JenkinsConfig;
use crate::error::{AppError, Result};

const MAX_STACK_LINES: usize = 40;

pub struct JenkinsClient {
    client: Client,
    base_url: Option<String>,
    user: Option<String>,
    token: Option<String>,
}

/// Result of a successful trigger.
#[derive(Debug, Clone)]
pub struct QueuedBuild {
    pub job: String,
    pub queue_url: Option<String>,
}

impl JenkinsClient {
    pub fn new(config: &JenkinsConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.user, &self.token) {
            (Some(user), Some(token)) => request.basic_auth(user, Some(token)),
            _ => request,
        }
    }

    /// Failed cases from `<build>/testReport/api/json`.
    ///
    /// `Ok(None)` when the build has no test report, so callers can fall back
    /// to the console log.
    pub async fn fetch_failed_cases(&self, build: &str) -> Result<Option<Vec<FailedCase>>> {
        let url = format!("{build}/testReport/api/json");
        tracing::info!(url = %url, "Fetching test report");

        let response = self.authed(self.client.get(&url)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!(build = %build, "Build has no test report");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Jenkins(format!(
                "Test report request returned {status}: {body}"
            )));
        }

        let report: TestReport = response.json().await?;
        let cases = report.failed_cases();
        tracing::info!(failed = cases.len(), "Parsed test report");
        Ok(Some(cases))
    }

    pub async fn fetch_console(&self, build: &str) -> Result<String> {
        let url = format!("{build}/consoleText");
        tracing::info!(url = %url, "Fetching console log");

        let response = self.authed(self.client.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Jenkins(format!(
                "Console request returned {status} for {build}"
            )));
        }
        Ok(response.text().await?)
    }

    /// POST `buildWithParameters` for `job`, which may be a `folder/job` path.
    pub async fn trigger(&self, job: &str, params: &BTreeMap<String, String>) -> Result<QueuedBuild> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Config("Jenkins URL is not configured".to_string()))?;
        let url = format!("{base}/{}/buildWithParameters", job_path(job));

        tracing::info!(
            job = %job,
            params = ?mask_params(params),
            "Triggering Jenkins job"
        );

        let response = self
            .authed(self.client.post(&url))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Jenkins(format!(
                "Trigger of {job} returned {status}: {body}"
            )));
        }

        let queue_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        tracing::info!(job = %job, queue_url = ?queue_url, "Job queued");

        Ok(QueuedBuild {
            job: job.to_string(),
            queue_url,
        })
    }
}

// --- Test report types ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestReport {
    #[serde(default)]
    suites: Vec<Suite>,
    /// Matrix and multi-branch jobs nest their results per child build.
    #[serde(default)]
    child_reports: Vec<ChildReport>,
}

#[derive(Debug, Deserialize)]
struct ChildReport {
    #[serde(default)]
    result: Option<TestReport>,
}

#[derive(Debug, Deserialize)]
struct Suite {
    #[serde(default)]
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Case {
    #[serde(default)]
    class_name: String,
    name: String,
    status: String,
    error_details: Option<String>,
    error_stack_trace: Option<String>,
}

impl TestReport {
    fn failed_cases(&self) -> Vec<FailedCase> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<FailedCase>) {
        let failed = self
            .suites
            .iter()
            .flat_map(|s| &s.cases)
            .filter(|c| c.status == "FAILED" || c.status == "REGRESSION");

        for case in failed {
            let excerpt = case
                .error_stack_trace
                .as_deref()
                .unwrap_or_default()
                .lines()
                .take(MAX_STACK_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            out.push(FailedCase {
                case_id: case_id(&case.name).or_else(|| case_id(&case.class_name)),
                name: case.name.clone(),
                error_message: case.error_details.clone().unwrap_or_default(),
                excerpt,
            });
        }

        for child in self.child_reports.iter().filter_map(|c| c.result.as_ref()) {
            child.collect(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<String>) -> JenkinsConfig {
        JenkinsConfig {
            url,
            user: Some("qe".to_string()),
            token: Some("t0k".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_failed_cases() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "suites": [{
                "cases": [
                    {"className": "grc", "name": "RHACM4K_3471 create policy", "status": "FAILED",
                     "errorDetails": "Timed out retrying", "errorStackTrace": "at cy.get\nat Context"},
                    {"className": "grc", "name": "RHACM4K-3472 delete policy", "status": "PASSED"},
                    {"className": "grc", "name": "status sync", "status": "REGRESSION",
                     "errorDetails": null, "errorStackTrace": null}
                ]
            }]
        }"#;
        let mock = server
            .mock("GET", "/job/grc/12/testReport/api/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = JenkinsClient::new(&config(None)).unwrap();
        let build = format!("{}/job/grc/12", server.url());
        let cases = client.fetch_failed_cases(&build).await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id.as_deref(), Some("RHACM4K-3471"));
        assert_eq!(cases[0].error_message, "Timed out retrying");
        assert_eq!(cases[0].excerpt, "at cy.get\nat Context");
        assert_eq!(cases[1].case_id, None);
        assert_eq!(cases[1].error_message, "");
    }

    #[tokio::test]
    async fn test_missing_test_report_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/job/grc/12/testReport/api/json")
            .with_status(404)
            .create_async()
            .await;

        let client = JenkinsClient::new(&config(None)).unwrap();
        let build = format!("{}/job/grc/12", server.url());
        assert!(client.fetch_failed_cases(&build).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_console() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/job/grc/12/consoleText")
            .with_status(200)
            .with_body("[FAIL] RHACM4K-1: boom\n")
            .create_async()
            .await;

        let client = JenkinsClient::new(&config(None)).unwrap();
        let text = client
            .fetch_console(&format!("{}/job/grc/12", server.url()))
            .await
            .unwrap();
        assert!(text.contains("RHACM4K-1"));
    }

    #[tokio::test]
    async fn test_trigger_returns_queue_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/job/qe/job/grc-e2e/buildWithParameters")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("TEST_TAGS".into(), "@zstream||@3471".into()),
                mockito::Matcher::UrlEncoded("PR_NUMBER".into(), "12".into()),
            ]))
            .match_header("authorization", mockito::Matcher::Regex("^Basic ".into()))
            .with_status(201)
            .with_header("location", "https://jenkins/queue/item/99/")
            .create_async()
            .await;

        let client = JenkinsClient::new(&config(Some(format!("{}/", server.url())))).unwrap();
        let params = BTreeMap::from([
            ("TEST_TAGS".to_string(), "@zstream||@3471".to_string()),
            ("PR_NUMBER".to_string(), "12".to_string()),
        ]);
        let queued = client.trigger("qe/grc-e2e", &params).await.unwrap();

        mock.assert_async().await;
        assert_eq!(queued.queue_url.as_deref(), Some("https://jenkins/queue/item/99/"));
    }

    #[tokio::test]
    async fn test_trigger_failure_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/job/globalhub-e2e/buildWithParameters")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("No valid crumb")
            .create_async()
            .await;

        let client = JenkinsClient::new(&config(Some(server.url()))).unwrap();
        let err = client
            .trigger("globalhub-e2e", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_trigger_without_url_is_config_error() {
        let client = JenkinsClient::new(&config(None)).unwrap();
        let err = client.trigger("x", &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
