//! Polarion REST client for test case titles and steps.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::config::PolarionConfig;
use crate::error::{AppError, Result};

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStep {
    pub step: String,
    pub expected: String,
}

#[derive(Debug, Clone)]
pub struct PolarionCase {
    pub id: String,
    pub title: String,
    pub steps: Vec<TestStep>,
}

enum Auth {
    Token(String),
    Basic { user: String, password: String },
}

pub struct PolarionClient {
    client: Client,
    endpoint: String,
    project: String,
    auth: Auth,
}

impl PolarionClient {
    pub fn new(config: &PolarionConfig) -> Result<Self> {
        let auth = match (&config.token, &config.user, &config.password) {
            (Some(token), _, _) => Auth::Token(token.clone()),
            (None, Some(user), Some(password)) => Auth::Basic {
                user: user.clone(),
                password: password.clone(),
            },
            _ => {
                return Err(AppError::Config(
                    "Polarion needs POLARION_TOKEN or POLARION_USER and POLARION_PASSWORD".to_string(),
                ))
            }
        };

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            auth,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("accept", "application/json");
        match &self.auth {
            Auth::Token(token) => request.bearer_auth(token),
            Auth::Basic { user, password } => request.basic_auth(user, Some(password)),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.authed(self.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Polarion(format!("{url} returned {status}: {body}")));
        }
        Ok(response.json::<T>().await?)
    }

    /// Title and ordered steps of a test case work item.
    pub async fn get_test_case(&self, id: &str) -> Result<PolarionCase> {
        let item_url = format!(
            "{}/rest/v1/projects/{}/workitems/{}",
            self.endpoint,
            urlencoding::encode(&self.project),
            urlencoding::encode(id)
        );
        tracing::info!(case = %id, "Fetching Polarion test case");

        let item: Document<Resource<TitleAttributes>> = self.get(&item_url).await?;
        let steps: Document<Vec<StepResource>> =
            self.get(&format!("{item_url}/teststeps")).await?;

        let mut ordered = steps.data;
        ordered.sort_by_key(|s| s.attributes.index.parse::<u32>().unwrap_or(u32::MAX));

        let steps = ordered
            .into_iter()
            .map(|s| {
                let mut values = s.attributes.values.into_iter().map(|v| strip_html(&v.value));
                TestStep {
                    step: values.next().unwrap_or_default(),
                    expected: values.next().unwrap_or_default(),
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(case = %id, steps = steps.len(), "Fetched Polarion test case");
        Ok(PolarionCase {
            id: id.to_string(),
            title: item.data.attributes.title,
            steps,
        })
    }
}

fn strip_html(value: &str) -> String {
    let text = HTML_TAG.replace_all(value, " ");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// --- JSON:API response types ---

#[derive(Debug, Deserialize)]
struct Document<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    attributes: A,
}

type StepResource = Resource<StepAttributes>;

#[derive(Debug, Deserialize)]
struct StepAttributes {
    #[serde(default)]
    index: String,
    #[serde(default)]
    values: Vec<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct TitleAttributes {
    #[serde(default)]
    title: String,
}
