use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub jenkins: JenkinsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub polarion: PolarionConfig,
    #[serde(default)]
    pub runbook: RunbookConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

#[derive(Deserialize, Clone, Default)]
pub struct GitHubConfig {
    /// Personal access token. Anonymous requests are used when absent.
    pub token: Option<String>,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct JenkinsConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
    /// Skip TLS verification; internal Jenkins instances use private CAs.
    #[serde(default = "default_jenkins_insecure")]
    pub insecure: bool,
    #[serde(default = "default_jenkins_timeout")]
    pub timeout_secs: u64,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            token: None,
            insecure: default_jenkins_insecure(),
            timeout_secs: default_jenkins_timeout(),
        }
    }
}

impl std::fmt::Debug for JenkinsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("insecure", &self.insecure)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible endpoint (without `/v1/...`).
    pub endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_model(),
            api_key: None,
            timeout_secs: default_model_timeout(),
            temperature: default_temperature(),
        }
    }
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct PolarionConfig {
    #[serde(default = "default_polarion_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_polarion_project")]
    pub project: String,
    pub token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for PolarionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_polarion_endpoint(),
            project: default_polarion_project(),
            token: None,
            user: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for PolarionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolarionConfig")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunbookConfig {
    #[serde(default = "default_runbook_path")]
    pub path: PathBuf,
}

impl Default for RunbookConfig {
    fn default() -> Self {
        Self {
            path: default_runbook_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    /// Replaces the built-in component catalog when set.
    pub rules_path: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_min_tests_per_tag")]
    pub min_tests_per_tag: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            output_dir: default_output_dir(),
            min_tests_per_tag: default_min_tests_per_tag(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkspaceConfig {
    /// Parent of temporary clone directories. System temp dir when unset.
    pub base_dir: Option<PathBuf>,
}

fn default_jenkins_insecure() -> bool {
    true
}

fn default_jenkins_timeout() -> u64 {
    30
}

fn default_model() -> String {
    "deepseek-r1-distill-qwen-14b".to_string()
}

fn default_model_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

fn default_polarion_endpoint() -> String {
    "https://polarion.engineering.redhat.com/polarion".to_string()
}

fn default_polarion_project() -> String {
    "RHACM4K".to_string()
}

fn default_runbook_path() -> PathBuf {
    PathBuf::from("runbooks/component-keywords.md")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-selection")
}

fn default_min_tests_per_tag() -> usize {
    5
}

/// Environment variables used by the existing QE scripts, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("GITHUB_TOKEN", "github.token"),
    ("JENKINS_URL", "jenkins.url"),
    ("JENKINS_USER", "jenkins.user"),
    ("JENKINS_TOKEN", "jenkins.token"),
    ("MODEL_API", "model.endpoint"),
    ("MODEL_ID", "model.model"),
    ("API_KEY", "model.api_key"),
    ("POLARION_API", "polarion.endpoint"),
    ("POLARION_USER", "polarion.user"),
    ("POLARION_PASSWORD", "polarion.password"),
    ("POLARION_TOKEN", "polarion.token"),
];

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // A missing .env is normal
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder();

        // Well-known variables act as defaults so prefixed variables still win
        for (var, key) in LEGACY_ENV {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    builder = builder
                        .set_default(*key, value)
                        .map_err(|e| AppError::Config(e.to_string()))?;
                }
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("qe-assist").required(false));
        }

        // Environment variable overrides, e.g. QE_ASSIST__JENKINS__URL
        builder = builder.add_source(
            config::Environment::with_prefix("QE_ASSIST")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn jenkins_url(&self) -> Result<&str> {
        self.jenkins
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Config("Jenkins URL is not configured (JENKINS_URL)".to_string()))
    }
}
