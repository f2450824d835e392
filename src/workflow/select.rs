use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::extract::TagIndex;
use crate::jenkins::JenkinsClient;
use crate::platform::types::{PrRef, PullRequest};
use crate::platform::Platform;
use crate::report::{
    batch_report, selection_report, test_list, write_artifact, PrSummary, SelectionView,
};
use crate::selection::{
    display_expression, expression_terms, select_tests, trigger_params, Catalog,
    ComponentProfile, TagMapper, TagSelection, TestSelection,
};
use crate::workflow::types::SelectionOutcome;
use crate::workspace::TestCheckout;

#[derive(Debug, Clone, Default)]
pub struct SelectRequest {
    pub pr_urls: Vec<String>,
    /// Overrides component detection from the repository name.
    pub component: Option<String>,
    /// Use this checkout instead of cloning the component's test repository.
    pub test_repo_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub trigger: bool,
    pub jenkins_job: Option<String>,
    /// `KEY:VALUE,...` build parameters.
    pub jenkins_params: Option<String>,
}

/// Machine-readable selection summary written next to the HTML report.
#[derive(Serialize)]
struct SelectionSummary<'a> {
    component: &'a str,
    prs: Vec<String>,
    tags: &'a BTreeSet<String>,
    expression: &'a str,
    docs_only: bool,
    tests: &'a TestSelection,
}

pub async fn run(
    config: &AppConfig,
    platform: &dyn Platform,
    request: &SelectRequest,
) -> Result<SelectionOutcome> {
    if request.pr_urls.len() > 1 {
        run_batch(config, platform, request).await
    } else {
        run_single(config, platform, request).await
    }
}

pub async fn run_single(
    config: &AppConfig,
    platform: &dyn Platform,
    request: &SelectRequest,
) -> Result<SelectionOutcome> {
    run_prs(config, platform, request, false).await
}

/// All PRs must belong to one component; the test repository is cloned once.
pub async fn run_batch(
    config: &AppConfig,
    platform: &dyn Platform,
    request: &SelectRequest,
) -> Result<SelectionOutcome> {
    run_prs(config, platform, request, true).await
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    match &config.selection.rules_path {
        Some(path) => Catalog::load(path),
        None => Catalog::builtin(),
    }
}

fn resolve_component<'c>(
    catalog: &'c Catalog,
    requested: Option<&str>,
    prs: &[PullRequest],
) -> Result<&'c ComponentProfile> {
    if let Some(name) = requested {
        return catalog
            .get(name)
            .ok_or_else(|| AppError::Selection(format!("Unknown component: {name}")));
    }

    let mut detected: Option<&ComponentProfile> = None;
    for pr in prs {
        let profile = catalog.detect(&pr.pr_ref.repo).ok_or_else(|| {
            AppError::Selection(format!(
                "Cannot detect a component for repository {}",
                pr.pr_ref.full_name()
            ))
        })?;
        match detected {
            Some(first) if first.name != profile.name => {
                return Err(AppError::Selection(format!(
                    "PRs span several components ({} and {}); batch them per component",
                    first.name, profile.name
                )));
            }
            _ => detected = Some(profile),
        }
    }
    detected.ok_or_else(|| AppError::Selection("No PRs to select tests for".to_string()))
}

async fn run_prs(
    config: &AppConfig,
    platform: &dyn Platform,
    request: &SelectRequest,
    batch: bool,
) -> Result<SelectionOutcome> {
    if request.pr_urls.is_empty() {
        return Err(AppError::InvalidInput("At least one PR URL is required".to_string()));
    }
    let catalog = load_catalog(config)?;

    let mut prs = Vec::with_capacity(request.pr_urls.len());
    for url in &request.pr_urls {
        let pr_ref = PrRef::parse(url)?;
        prs.push(platform.get_pull_request(&pr_ref).await?);
    }

    let profile = resolve_component(&catalog, request.component.as_deref(), &prs)?;
    tracing::info!(component = %profile.name, prs = prs.len(), batch, "Selecting tests");

    let mapper = TagMapper::new(profile)?;
    let tag_selections: Vec<TagSelection> = prs
        .iter()
        .map(|pr| {
            tracing::info!(pr = %pr.pr_ref, files = pr.changed_files.len(), "Mapping changed files");
            mapper.map_files(&pr.changed_files)
        })
        .collect();
    let docs_only = tag_selections.iter().all(|s| s.is_docs_only);

    let index = if docs_only {
        tracing::info!("Only documentation changed, skipping test repository");
        None
    } else {
        let checkout = match &request.test_repo_dir {
            Some(dir) => TestCheckout::local(dir)?,
            None => {
                TestCheckout::clone(
                    &profile.name,
                    &profile.test_repo,
                    &config.workspace,
                    config.github.token.as_deref(),
                )
                .await?
            }
        };
        let root = checkout.path().to_path_buf();
        let suffixes = profile.test_file_suffixes.clone();
        let index = tokio::task::spawn_blocking(move || TagIndex::scan(&root, &suffixes))
            .await
            .map_err(|e| AppError::Workspace(format!("Scan task panicked: {e}")))?;
        Some((index, checkout.source()))
    };

    let mut combined = TestSelection::default();
    let mut per_pr_tests = Vec::with_capacity(prs.len());
    let mut all_tags = BTreeSet::new();
    for selection in &tag_selections {
        all_tags.extend(selection.tags.iter().cloned());
        let tests = match &index {
            Some((index, _)) => select_tests(selection, index),
            None => TestSelection::default(),
        };
        per_pr_tests.push(tests.len());
        combined.merge(&tests);
    }

    let combined_tags = TagSelection {
        tags: all_tags.clone(),
        ..Default::default()
    };
    let selected: Vec<_> = combined.iter().cloned().collect();
    let terms = expression_terms(
        profile,
        &combined_tags,
        &selected,
        config.selection.min_tests_per_tag,
    );
    let expression = terms.join("||");
    let total_tags = index.as_ref().map(|(i, _)| i.tag_count()).unwrap_or(0);
    let test_source = index
        .as_ref()
        .map(|(_, source)| source.clone())
        .unwrap_or_else(|| profile.test_repo.clone());

    tracing::info!(
        tags = all_tags.len(),
        tests = combined.len(),
        expression = %expression,
        "Selection complete"
    );

    let view = SelectionView {
        component: profile,
        prs: prs
            .iter()
            .zip(&tag_selections)
            .zip(&per_pr_tests)
            .map(|((pr, tags), tests)| PrSummary {
                pr,
                tags,
                tests: *tests,
            })
            .collect(),
        tags: all_tags.clone(),
        tests: &combined,
        total_tags,
        expression: display_expression(&terms),
        test_source,
    };

    let stem = if batch {
        format!("batch-{}", profile.name)
    } else {
        format!("pr-{}", prs[0].pr_ref.number)
    };
    let html = if batch {
        batch_report(&view)
    } else {
        selection_report(&view)
    };

    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| config.selection.output_dir.clone());
    let report_path = write_artifact(&output_dir, &format!("{stem}-test-selection.html"), &html).await?;
    let test_list_path =
        write_artifact(&output_dir, &format!("{stem}-tests.txt"), &test_list(&combined)).await?;

    let summary = SelectionSummary {
        component: &profile.name,
        prs: prs.iter().map(|p| p.url.clone()).collect(),
        tags: &all_tags,
        expression: &expression,
        docs_only,
        tests: &combined,
    };
    write_artifact(
        &output_dir,
        &format!("{stem}-selection.json"),
        &serde_json::to_string_pretty(&summary)?,
    )
    .await?;

    let queued = if !request.trigger {
        None
    } else if expression.is_empty() {
        tracing::warn!("No tags selected, not triggering Jenkins");
        None
    } else {
        let jenkins_url = config.jenkins_url()?;
        let job = request.jenkins_job.as_deref().unwrap_or(&profile.jenkins_job);
        let params = trigger_params(
            profile,
            request.jenkins_params.as_deref(),
            &expression,
            &prs,
            batch,
        );
        tracing::info!(jenkins = %jenkins_url, job = %job, "Triggering selected tests");
        let client = JenkinsClient::new(&config.jenkins)?;
        Some(client.trigger(job, &params).await?)
    };

    Ok(SelectionOutcome {
        component: profile.name.clone(),
        pr_count: prs.len(),
        tags: all_tags,
        tests: combined,
        total_tags,
        expression,
        docs_only,
        report_path,
        test_list_path,
        queued,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::types::ChangedFile;
    use async_trait::async_trait;

    struct FakePlatform;

    #[async_trait]
    impl Platform for FakePlatform {
        async fn get_pull_request(&self, pr: &PrRef) -> Result<PullRequest> {
            Ok(PullRequest {
                pr_ref: pr.clone(),
                title: "Change".to_string(),
                author: "dev".to_string(),
                base_ref: "main".to_string(),
                head_ref: "change".to_string(),
                url: pr.html_url(),
                changed_files: vec![ChangedFile::new("README.md")],
            })
        }
    }

    #[test]
    fn test_resolve_component_rejects_mixed_batch() {
        let catalog = Catalog::builtin().unwrap();
        let pr = |repo: &str| PullRequest {
            pr_ref: PrRef {
                owner: "stolostron".to_string(),
                repo: repo.to_string(),
                number: 1,
            },
            title: String::new(),
            author: String::new(),
            base_ref: String::new(),
            head_ref: String::new(),
            url: String::new(),
            changed_files: vec![],
        };

        let prs = vec![pr("multicluster-global-hub"), pr("glo-grafana")];
        assert_eq!(resolve_component(&catalog, None, &prs).unwrap().name, "global-hub");

        let mixed = vec![pr("multicluster-global-hub"), pr("search-v2-api")];
        assert!(resolve_component(&catalog, None, &mixed).is_err());

        assert_eq!(resolve_component(&catalog, Some("GRC"), &mixed).unwrap().name, "grc");
        assert!(resolve_component(&catalog, None, &[pr("console")]).is_err());
    }

    #[tokio::test]
    async fn test_docs_only_pr_skips_checkout() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.selection.output_dir = tmp.path().to_path_buf();

        let request = SelectRequest {
            pr_urls: vec!["https://github.com/stolostron/search-v2-api/pull/5".to_string()],
            trigger: true,
            ..Default::default()
        };
        let outcome = run(&config, &FakePlatform, &request).await.unwrap();

        assert!(outcome.docs_only);
        assert!(outcome.tests.is_empty());
        assert!(outcome.expression.is_empty());
        assert!(outcome.queued.is_none());
        assert!(outcome.report_path.ends_with("pr-5-test-selection.html"));
        assert!(tmp.path().join("pr-5-selection.json").exists());
    }

    #[tokio::test]
    async fn test_no_urls_is_error() {
        let config = AppConfig::default();
        let err = run(&config, &FakePlatform, &SelectRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
