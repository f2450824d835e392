use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runbook error: {0}")]
    Runbook(String),

    #[error("Selection rules error: {0}")]
    Rules(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Jenkins API error: {0}")]
    Jenkins(String),

    #[error("Polarion API error: {0}")]
    Polarion(String),

    #[error("Model API error: {0}")]
    ModelApi(String),

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Test selection failed: {0}")]
    Selection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

impl From<git2::Error> for AppError {
    fn from(e: git2::Error) -> Self {
        AppError::Git(e.message().to_string())
    }
}

impl From<regex::Error> for AppError {
    fn from(e: regex::Error) -> Self {
        AppError::Rules(format!("Invalid pattern: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
