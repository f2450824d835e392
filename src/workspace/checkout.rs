use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::WorkspaceConfig;
use crate::error::{AppError, Result};
use crate::workspace::git;

/// A test repository on local disk.
///
/// Cloned checkouts live in a temporary directory that is removed when the
/// value is dropped, on success and error paths alike.
pub enum TestCheckout {
    Cloned { dir: TempDir, url: String },
    Local(PathBuf),
}

impl TestCheckout {
    /// Shallow-clone `url` into a fresh `qe-tests-<component>-*` directory.
    pub async fn clone(
        component: &str,
        url: &str,
        config: &WorkspaceConfig,
        token: Option<&str>,
    ) -> Result<Self> {
        let prefix = format!("qe-tests-{component}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match &config.base_dir {
            Some(base) => {
                tokio::fs::create_dir_all(base).await.map_err(|e| {
                    AppError::Workspace(format!("Failed to create workspace dir: {e}"))
                })?;
                builder.tempdir_in(base)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| AppError::Workspace(format!("Failed to create clone dir: {e}")))?;

        tracing::info!(url = %url, path = %dir.path().display(), "Cloning test repository");
        // On failure `dir` drops here and removes the partial clone.
        git::shallow_clone(url, dir.path(), token).await?;

        Ok(TestCheckout::Cloned {
            dir,
            url: url.to_string(),
        })
    }

    /// Use an existing checkout as-is. Nothing is removed on drop.
    pub fn local(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(AppError::Workspace(format!(
                "Test repository directory does not exist: {}",
                path.display()
            )));
        }
        Ok(TestCheckout::Local(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        match self {
            TestCheckout::Cloned { dir, .. } => dir.path(),
            TestCheckout::Local(path) => path,
        }
    }

    /// Where the tests came from, for reports.
    pub fn source(&self) -> String {
        match self {
            TestCheckout::Cloned { url, .. } => url.clone(),
            TestCheckout::Local(path) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_checkout_requires_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let checkout = TestCheckout::local(tmp.path()).unwrap();
        assert_eq!(checkout.path(), tmp.path());
        assert_eq!(checkout.source(), tmp.path().display().to_string());

        assert!(TestCheckout::local(&tmp.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_failed_clone_leaves_nothing_behind() {
        let base = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig {
            base_dir: Some(base.path().join("clones")),
        };

        let result = TestCheckout::clone("grc", "ssh://example.invalid/x.git", &config, None).await;
        assert!(result.is_err());

        let leftovers = std::fs::read_dir(base.path().join("clones")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
