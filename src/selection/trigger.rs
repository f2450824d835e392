use std::collections::BTreeMap;

use super::catalog::{ComponentProfile, TriggerMode};
use crate::jenkins::parse_params;
use crate::platform::types::PullRequest;

const TAGS_PARAM: &str = "TEST_TAGS";
const AUTO: &str = "auto";

/// Build parameters for the component's Jenkins job.
///
/// `raw` is the user's `KEY:VALUE,...` string. `TEST_TAGS:auto` is replaced
/// by `expression`; a user-provided literal `TEST_TAGS` is kept.
pub fn trigger_params(
    profile: &ComponentProfile,
    raw: Option<&str>,
    expression: &str,
    prs: &[PullRequest],
    batch: bool,
) -> BTreeMap<String, String> {
    if profile.trigger_mode == TriggerMode::TagsOnly {
        return BTreeMap::from([(TAGS_PARAM.to_string(), expression.to_string())]);
    }

    let mut params = raw.map(parse_params).unwrap_or_default();
    if let Some(value) = params.get_mut(TAGS_PARAM) {
        if value == AUTO {
            *value = expression.to_string();
        }
    }

    if let Some(first) = prs.first() {
        params.insert("PR_NUMBER".to_string(), first.pr_ref.number.to_string());
        params.insert("PR_TITLE".to_string(), first.title.clone());
    }
    if batch {
        params.insert("BATCH_MODE".to_string(), "true".to_string());
        params.insert("PR_COUNT".to_string(), prs.len().to_string());
    }
    params
}
