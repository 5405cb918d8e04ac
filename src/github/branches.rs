use serde_json::json;
use tracing::info;

use super::api::ApiClient;
use super::errors::GitHubError;
use super::types::{encode_ref_path, GitRef, Repository, ROLLOUT_BRANCH, ROLLOUT_REF};
use crate::http::HttpMethod;

/// Handler for the rollout branch
#[derive(Debug, Clone)]
pub struct BranchHandler {
    api: ApiClient,
}

impl BranchHandler {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Create [`ROLLOUT_REF`] from the tip of the default branch.
    ///
    /// Fails with [`GitHubError::AlreadyExists`] when the branch is already there, so
    /// only one rollout per repository is in flight at a time.
    pub async fn create_branch_for_repo(&self, repo: &Repository) -> Result<String, GitHubError> {
        let tip: GitRef = self
            .api
            .fetch(
                HttpMethod::Get,
                &format!(
                    "repos/{}/git/ref/heads/{}",
                    repo.full_name,
                    encode_ref_path(&repo.default_branch)
                ),
                None,
            )
            .await
            // 409 is what GitHub answers for an empty repository.
            .map_err(|e| {
                e.classify(
                    &format!("branch {} of {}", repo.default_branch, repo.full_name),
                    &[404, 409],
                    &[],
                )
            })?;

        let body = json!({
            "ref": ROLLOUT_REF,
            "sha": tip.object.sha,
        });
        let created = self
            .api
            .call::<GitRef>(
                HttpMethod::Post,
                &format!("repos/{}/git/refs", repo.full_name),
                Some(&body),
            )
            .await
            .map_err(|e| {
                e.classify(
                    &format!("branch {ROLLOUT_BRANCH} in {}", repo.full_name),
                    &[404],
                    &[409, 422],
                )
            })?;

        info!(repository = %repo.full_name, sha = %tip.object.sha, "🌿 Created rollout branch");
        Ok(created
            .data
            .map(|reference| reference.reference)
            .unwrap_or_else(|| ROLLOUT_REF.to_string()))
    }

    /// Delete the rollout branch.
    pub async fn delete_branch(&self, repo: &Repository) -> Result<(), GitHubError> {
        self.api
            .call::<serde_json::Value>(
                HttpMethod::Delete,
                &format!("repos/{}/git/refs/heads/{ROLLOUT_BRANCH}", repo.full_name),
                None,
            )
            .await
            // GitHub answers 422 "Reference does not exist" for a missing branch.
            .map_err(|e| {
                e.classify(
                    &format!("branch {ROLLOUT_BRANCH} in {}", repo.full_name),
                    &[404, 422],
                    &[],
                )
            })?;

        info!(repository = %repo.full_name, "🗑️  Deleted rollout branch");
        Ok(())
    }

    /// Check if the rollout branch exists
    pub async fn branch_exists(&self, repo: &Repository) -> Result<bool, GitHubError> {
        match self
            .api
            .call::<serde_json::Value>(
                HttpMethod::Get,
                &format!("repos/{}/git/ref/heads/{ROLLOUT_BRANCH}", repo.full_name),
                None,
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
