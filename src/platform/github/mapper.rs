use octocrab::models::repos::DiffEntry;

use crate::platform::types;

/// Map octocrab's pull request and diff entries to our PR descriptor.
pub fn map_pull_request(
    pr_ref: &types::PrRef,
    pr: &octocrab::models::pulls::PullRequest,
    files: Vec<DiffEntry>,
) -> types::PullRequest {
    types::PullRequest {
        pr_ref: pr_ref.clone(),
        title: pr.title.clone().unwrap_or_default(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        base_ref: pr.base.ref_field.clone(),
        head_ref: pr.head.ref_field.clone(),
        url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| pr_ref.html_url()),
        changed_files: files.into_iter().map(map_diff_entry).collect(),
    }
}

fn map_diff_entry(entry: DiffEntry) -> types::ChangedFile {
    let status = serde_json::to_value(&entry.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "modified".to_string());

    types::ChangedFile {
        filename: entry.filename,
        status,
        additions: entry.additions,
        deletions: entry.deletions,
    }
}
