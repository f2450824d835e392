use async_trait::async_trait;
use octocrab::Octocrab;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper;

pub struct GitHubPlatform {
    client: Octocrab,
}

impl GitHubPlatform {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut builder = Octocrab::builder();
        match config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => builder = builder.personal_token(token.to_string()),
            None => tracing::warn!("GITHUB_TOKEN not set, using anonymous GitHub API access"),
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn get_pull_request(&self, pr: &PrRef) -> Result<PullRequest> {
        tracing::info!(pr = %pr, "Fetching pull request");

        let pulls = self.client.pulls(&pr.owner, &pr.repo);
        let data = pulls.get(pr.number).await?;

        let first_page = pulls.list_files(pr.number).await?;
        let files = self.client.all_pages(first_page).await?;

        let pull_request = mapper::map_pull_request(pr, &data, files);
        if pull_request.changed_files.is_empty() {
            return Err(AppError::GitHubApi(format!(
                "GitHub returned no changed files for {pr}"
            )));
        }

        tracing::info!(
            pr = %pr,
            title = %pull_request.title,
            author = %pull_request.author,
            files = pull_request.changed_files.len(),
            "Fetched pull request"
        );

        Ok(pull_request)
    }
}
