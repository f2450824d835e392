use std::path::Path;

use git2::{build::RepoBuilder, Cred, FetchOptions, RemoteCallbacks};

use crate::error::{AppError, Result};

/// Build `FetchOptions` for a depth-1 fetch. When a token is given it is
/// supplied through the credential callback and never written to disk.
fn make_fetch_options(token: Option<&str>) -> FetchOptions<'_> {
    let mut opts = FetchOptions::new();
    if let Some(token) = token {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
            Cred::userpass_plaintext("x-access-token", token)
        });
        opts.remote_callbacks(callbacks);
    }
    opts.depth(1);
    opts
}

/// Shallow-clone the default branch of `url` into `target`.
pub async fn shallow_clone(url: &str, target: &Path, token: Option<&str>) -> Result<()> {
    if !url.starts_with("https://") {
        return Err(AppError::Git(format!(
            "Expected HTTPS clone URL, got: {url}"
        )));
    }

    let url = url.to_string();
    let target = target.to_path_buf();
    let token = token.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let fetch_opts = make_fetch_options(token.as_deref());
        RepoBuilder::new()
            .fetch_options(fetch_opts)
            .clone(&url, &target)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Clone task panicked: {e}")))?
}
