use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::github::{ClientOptions, GitHubError};

/// Main configuration structure for add-files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddFilesConfig {
    /// GitHub connection settings
    pub github: GitHubConfig,
    /// Rollout behaviour
    pub rollout: RolloutConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// REST API root, override for GitHub Enterprise Server
    pub api_url: String,
    /// GitHub API token (falls back to GH_TOKEN, GITHUB_TOKEN, then `gh auth token`)
    pub token: Option<String>,
    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,
    /// Per-request timeout
    pub request_timeout_seconds: u64,
    /// Page size for list endpoints
    pub per_page: u32,
    /// Abort pagination after this many pages (unbounded when unset)
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RolloutConfig {
    /// Local workflow template committed to every repository
    pub workflow_path: String,
    /// Repositories processed at the same time
    pub concurrency: usize,
    /// Delete the rollout branch when a later step fails
    pub rollback_on_failure: bool,
    pub commit_message: String,
    pub pull_request_title: String,
    pub pull_request_body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default filter when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for AddFilesConfig {
    fn default() -> Self {
        let text = ClientOptions::default();
        Self {
            github: GitHubConfig {
                api_url: "https://api.github.com".to_string(),
                token: None,
                rate_limit: RateLimitConfig {
                    requests_per_second: 10,
                    burst_capacity: 20,
                },
                request_timeout_seconds: 30,
                per_page: text.per_page,
                max_pages: None,
            },
            rollout: RolloutConfig {
                workflow_path: "templates/codeql.yml".to_string(),
                concurrency: 4,
                rollback_on_failure: false,
                commit_message: text.commit_message,
                pull_request_title: text.pull_request_title,
                pull_request_body: text.pull_request_body,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
        }
    }
}

impl AddFilesConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (add-files.toml, .add-files-rc, or an explicit path)
    /// 3. Environment variables (prefixed with ADD_FILES_, nested with `__`)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("add-files.toml").exists() {
            builder = builder.add_source(File::new("add-files.toml", FileFormat::Toml));
        }

        if Path::new(".add-files-rc").exists() {
            builder = builder.add_source(File::new(".add-files-rc", FileFormat::Toml));
        }

        if let Some(path) = explicit {
            let path: PathBuf = path.to_path_buf();
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("ADD_FILES")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AddFilesConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.rollout.concurrency == 0 {
            anyhow::bail!("rollout.concurrency must be at least 1");
        }
        if self.github.per_page == 0 || self.github.per_page > 100 {
            anyhow::bail!("github.per_page must be between 1 and 100");
        }
        if self.github.max_pages == Some(0) {
            anyhow::bail!("github.max_pages must be at least 1 when set");
        }
        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            per_page: self.github.per_page,
            commit_message: self.rollout.commit_message.clone(),
            pull_request_title: self.rollout.pull_request_title.clone(),
            pull_request_body: self.rollout.pull_request_body.clone(),
        }
    }

    /// Resolve the API token: configuration, then GH_TOKEN, then GITHUB_TOKEN,
    /// then the GitHub CLI's stored credentials.
    pub fn resolve_token(&self) -> Result<String, GitHubError> {
        let configured = self.github.token.clone().filter(|t| !t.trim().is_empty());
        if let Some(token) = configured {
            return Ok(token);
        }

        for var in ["GH_TOKEN", "GITHUB_TOKEN"] {
            if let Ok(token) = std::env::var(var) {
                if !token.trim().is_empty() {
                    return Ok(token.trim().to_string());
                }
            }
        }

        match std::process::Command::new("gh").args(["auth", "token"]).output() {
            Ok(output) if output.status.success() => {
                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !token.is_empty() {
                    return Ok(token);
                }
            }
            Ok(_) | Err(_) => {}
        }

        Err(GitHubError::TokenNotFound(
            "set ADD_FILES_GITHUB__TOKEN, GH_TOKEN or GITHUB_TOKEN, or log in with `gh auth login`"
                .to_string(),
        ))
    }
}
