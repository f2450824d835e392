pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetch a pull request with every changed file.
    async fn get_pull_request(&self, pr: &PrRef) -> Result<PullRequest>;
}
