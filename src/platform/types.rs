use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

static PR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/\s]+)/([^/\s]+)/pull/(\d+)").expect("static regex")
});

/// Coordinates of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PrRef {
    /// Parse `https://github.com/<owner>/<repo>/pull/<n>[/files...]`.
    pub fn parse(url: &str) -> Result<Self> {
        let caps = PR_URL
            .captures(url)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid GitHub PR URL: {url}")))?;
        let number = caps[3]
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("Invalid PR number in URL: {url}")))?;
        Ok(Self {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
            number,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn html_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/pull/{}",
            self.owner, self.repo, self.number
        )
    }
}

impl fmt::Display for PrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
}

impl ChangedFile {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: "modified".to_string(),
            additions: 0,
            deletions: 0,
        }
    }
}

/// PR descriptor, read-only once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub pr_ref: PrRef,
    pub title: String,
    pub author: String,
    pub base_ref: String,
    pub head_ref: String,
    pub url: String,
    pub changed_files: Vec<ChangedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pr_url() {
        let pr = PrRef::parse("https://github.com/stolostron/multicluster-global-hub/pull/1234").unwrap();
        assert_eq!(pr.owner, "stolostron");
        assert_eq!(pr.repo, "multicluster-global-hub");
        assert_eq!(pr.number, 1234);
        assert_eq!(pr.full_name(), "stolostron/multicluster-global-hub");
    }

    #[test]
    fn test_parse_pr_url_with_suffix() {
        let pr = PrRef::parse("https://github.com/stolostron/search-v2-api/pull/77/files").unwrap();
        assert_eq!(pr.repo, "search-v2-api");
        assert_eq!(pr.number, 77);
    }

    #[test]
    fn test_parse_pr_url_rejects_issue_links() {
        assert!(PrRef::parse("https://github.com/stolostron/search-v2-api/issues/77").is_err());
        assert!(PrRef::parse("not a url").is_err());
    }
}
