//! Jenkins REST access: build results, console text and parameterized
//! triggers.

mod client;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};

pub use client::{JenkinsClient, QueuedBuild};

static BUILD_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?/\d+)(?:/|$)").expect("static regex"));

const SECRET_MARKERS: &[&str] = &["PASSWORD", "TOKEN", "SECRET"];

/// Normalise a build URL (`.../job/x/123/console`) to the build root
/// (`.../job/x/123`).
pub fn build_url(url: &str) -> Result<String> {
    BUILD_ROOT
        .captures(url.trim())
        .map(|c| c[1].to_string())
        .ok_or_else(|| AppError::InvalidInput(format!("Not a Jenkins build URL: {url}")))
}

/// `folder/job` becomes `job/folder/job/job`.
pub fn job_path(name: &str) -> String {
    name.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| format!("job/{}", urlencoding::encode(s)))
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse `KEY:VALUE,KEY2:VALUE2`. Pairs without a `:` are ignored; values
/// may contain further colons.
pub fn parse_params(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Copy of `params` safe to log.
pub fn mask_params(params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| {
            let upper = k.to_uppercase();
            let value = if SECRET_MARKERS.iter().any(|m| upper.contains(m)) {
                "***".to_string()
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect()
}
