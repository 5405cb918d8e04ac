use std::collections::BTreeMap;
use tracing::{debug, info};

use super::api::ApiClient;
use super::errors::GitHubError;
use super::types::{validate_full_name, validate_organization_name, Repository, CODEQL_LANGUAGES};
use crate::http::HttpMethod;

/// Handler for repository lookups
#[derive(Debug, Clone)]
pub struct RepositoryHandler {
    api: ApiClient,
    per_page: u32,
}

impl RepositoryHandler {
    pub fn new(api: ApiClient, per_page: u32) -> Self {
        Self { api, per_page }
    }

    /// List every repository of an organisation, following pagination to the end.
    ///
    /// An organisation without repositories yields an empty list; an unknown
    /// organisation yields [`GitHubError::NotFound`].
    pub async fn get_repos(&self, organization: &str) -> Result<Vec<Repository>, GitHubError> {
        validate_organization_name(organization)?;

        let path = format!("orgs/{organization}/repos?per_page={}", self.per_page);
        let repos: Vec<Repository> = self
            .api
            .get_paginated(&path)
            .await
            .map_err(|e| e.classify(&format!("organization {organization}"), &[404], &[]))?;

        info!(organization, count = repos.len(), "Fetched organization repositories");
        Ok(repos)
    }

    /// Fetch one repository by `owner/name`.
    pub async fn get_repo(&self, full_name: &str) -> Result<Repository, GitHubError> {
        validate_full_name(full_name)?;

        self.api
            .fetch(HttpMethod::Get, &format!("repos/{full_name}"), None)
            .await
            .map_err(|e| e.classify(&format!("repository {full_name}"), &[404], &[]))
    }

    /// Languages detected in the repository that CodeQL supports, in
    /// [`CODEQL_LANGUAGES`] order. Empty when none match.
    pub async fn get_codeql_languages(&self, repo: &Repository) -> Result<Vec<String>, GitHubError> {
        let detected: BTreeMap<String, u64> = self
            .api
            .fetch(
                HttpMethod::Get,
                &format!("repos/{}/languages", repo.full_name),
                None,
            )
            .await
            .map_err(|e| e.classify(&format!("repository {}", repo.full_name), &[404], &[]))?;

        let supported: Vec<String> = CODEQL_LANGUAGES
            .iter()
            .filter(|language| detected.contains_key(**language))
            .map(|language| language.to_string())
            .collect();

        debug!(
            repository = %repo.full_name,
            detected = detected.len(),
            supported = ?supported,
            "Language check"
        );
        Ok(supported)
    }
}
