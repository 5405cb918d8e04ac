use serde_json::json;
use tracing::info;

use super::api::ApiClient;
use super::errors::GitHubError;
use super::types::{PullRequestRecord, Repository, ROLLOUT_BRANCH};
use crate::http::HttpMethod;

/// Handler for GitHub pull request operations
#[derive(Debug, Clone)]
pub struct PullRequestHandler {
    api: ApiClient,
    title: String,
    body: String,
}

impl PullRequestHandler {
    pub fn new(api: ApiClient, title: String, body: String) -> Self {
        Self { api, title, body }
    }

    /// Open a pull request from the rollout branch into the default branch and
    /// return its URL.
    pub async fn raise_pull_request(&self, repo: &Repository) -> Result<String, GitHubError> {
        let request = json!({
            "title": self.title,
            "head": ROLLOUT_BRANCH,
            "base": repo.default_branch,
            "body": self.body,
            "maintainer_can_modify": true,
        });
        let resource = format!("pull request from {ROLLOUT_BRANCH} in {}", repo.full_name);

        let pr: PullRequestRecord = self
            .api
            .fetch(
                HttpMethod::Post,
                &format!("repos/{}/pulls", repo.full_name),
                Some(&request),
            )
            .await
            .map_err(|e| match e {
                // 422 also covers "No commits between", which is not a duplicate.
                GitHubError::Api {
                    status: 422,
                    ref message,
                    ..
                } if message.to_lowercase().contains("already exists") => {
                    GitHubError::AlreadyExists {
                        resource: resource.clone(),
                    }
                }
                other => other.classify(&resource, &[404], &[]),
            })?;

        info!(
            repository = %repo.full_name,
            number = pr.number,
            url = %pr.html_url,
            "📋 Opened pull request"
        );
        Ok(pr.html_url)
    }

    /// Most recent pull request (any state) opened from the rollout branch.
    pub async fn find_rollout_pull_request(
        &self,
        repo: &Repository,
    ) -> Result<Option<PullRequestRecord>, GitHubError> {
        let path = format!(
            "repos/{}/pulls?head={}:{ROLLOUT_BRANCH}&state=all",
            repo.full_name,
            repo.owner()
        );
        let pulls: Vec<PullRequestRecord> = self
            .api
            .fetch(HttpMethod::Get, &path, None)
            .await
            .map_err(|e| e.classify(&format!("repository {}", repo.full_name), &[404], &[]))?;

        Ok(pulls
            .into_iter()
            .find(|pr| pr.head.reference == ROLLOUT_BRANCH))
    }
}
