use std::sync::Arc;
use std::time::Duration;

use super::api::ApiClient;
use super::branches::BranchHandler;
use super::contents::ContentHandler;
use super::errors::GitHubError;
use super::pulls::PullRequestHandler;
use super::repos::RepositoryHandler;
use crate::config::AddFilesConfig;
use crate::http::{RateLimitedHttpClient, RestTransport, TransportSettings};

/// Text and paging knobs shared by the handlers.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub per_page: u32,
    pub commit_message: String,
    pub pull_request_title: String,
    pub pull_request_body: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            per_page: 100,
            commit_message: "Add CodeQL code scanning workflow".to_string(),
            pull_request_title: "Add CodeQL code scanning workflow".to_string(),
            pull_request_body: "This pull request adds a CodeQL workflow so code scanning runs on pushes and pull requests to the default branch.".to_string(),
        }
    }
}

/// Entry point to every GitHub operation the rollout performs.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api: ApiClient,
    repos: RepositoryHandler,
    branches: BranchHandler,
    contents: ContentHandler,
    pulls: PullRequestHandler,
}

impl GitHubClient {
    pub fn new(api: ApiClient, options: ClientOptions) -> Self {
        Self {
            repos: RepositoryHandler::new(api.clone(), options.per_page),
            branches: BranchHandler::new(api.clone()),
            contents: ContentHandler::new(api.clone(), options.commit_message),
            pulls: PullRequestHandler::new(
                api.clone(),
                options.pull_request_title,
                options.pull_request_body,
            ),
            api,
        }
    }

    /// Build a client over any transport, e.g. an in-memory one in tests.
    pub fn with_transport(transport: Arc<dyn RestTransport>, options: ClientOptions) -> Self {
        Self::new(ApiClient::new(transport), options)
    }

    /// Build the octocrab-backed client described by the configuration.
    pub fn from_config(config: &AddFilesConfig) -> Result<Self, GitHubError> {
        let token = config.resolve_token()?;
        let transport = RateLimitedHttpClient::new(TransportSettings {
            api_url: config.github.api_url.clone(),
            token,
            requests_per_second: config.github.rate_limit.requests_per_second,
            burst_capacity: config.github.rate_limit.burst_capacity,
            request_timeout: Duration::from_secs(config.github.request_timeout_seconds),
        })?;

        let api = ApiClient::new(Arc::new(transport)).with_max_pages(config.github.max_pages);
        Ok(Self::new(api, config.client_options()))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn repos(&self) -> &RepositoryHandler {
        &self.repos
    }

    pub fn branches(&self) -> &BranchHandler {
        &self.branches
    }

    pub fn contents(&self) -> &ContentHandler {
        &self.contents
    }

    pub fn pulls(&self) -> &PullRequestHandler {
        &self.pulls
    }
}
