use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde_json::json;
use std::path::Path;
use tracing::info;

use super::api::ApiClient;
use super::errors::GitHubError;
use super::types::{encode_ref_query, ContentWriteResponse, Repository, ROLLOUT_BRANCH, WORKFLOW_DIR};
use crate::http::HttpMethod;

/// Repository path of a workflow file
pub fn workflow_path(file_name: &str) -> String {
    format!("{WORKFLOW_DIR}/{file_name}")
}

/// Handler for workflow files in repository contents
#[derive(Debug, Clone)]
pub struct ContentHandler {
    api: ApiClient,
    commit_message: String,
}

impl ContentHandler {
    pub fn new(api: ApiClient, commit_message: String) -> Self {
        Self {
            api,
            commit_message,
        }
    }

    /// Whether `.github/workflows/<file_name>` exists on the default branch.
    ///
    /// A missing file and a missing repository both answer `Ok(false)`. This is the
    /// only lookup where not-found is not an error; the other operations surface it.
    pub async fn does_codeql_workflow_exist(
        &self,
        repo: &Repository,
        file_name: &str,
    ) -> Result<bool, GitHubError> {
        let mut path = format!("repos/{}/contents/{}", repo.full_name, workflow_path(file_name));
        if !repo.default_branch.is_empty() {
            path.push_str(&format!("?ref={}", encode_ref_query(&repo.default_branch)));
        }

        match self
            .api
            .call::<serde_json::Value>(HttpMethod::Get, &path, None)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Commit the local workflow template to the rollout branch and return its file name.
    pub async fn create_workflow_file(
        &self,
        repo: &Repository,
        local_path: &Path,
    ) -> Result<String, GitHubError> {
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                GitHubError::InvalidRequest(format!(
                    "workflow path {} has no file name",
                    local_path.display()
                ))
            })?
            .to_string();
        let content = tokio::fs::read(local_path).await?;
        let target = workflow_path(&file_name);

        let body = json!({
            "message": self.commit_message,
            "content": BASE64_STANDARD.encode(&content),
            "branch": ROLLOUT_BRANCH,
        });
        let written = self
            .api
            .call::<ContentWriteResponse>(
                HttpMethod::Put,
                &format!("repos/{}/contents/{target}", repo.full_name),
                Some(&body),
            )
            .await
            // Without a blob sha GitHub rejects writes to an existing file with 422.
            .map_err(|e| {
                e.classify(
                    &format!("{target} on {ROLLOUT_BRANCH} in {}", repo.full_name),
                    &[404],
                    &[409, 422],
                )
            })?;

        info!(repository = %repo.full_name, file = %target, "📄 Committed workflow file");
        Ok(written
            .data
            .map(|response| response.content.name)
            .unwrap_or(file_name))
    }
}
