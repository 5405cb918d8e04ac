use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::types::{RolloutRecord, RolloutResult, RolloutStep};
use crate::github::{GitHubClient, GitHubError, Repository};
use crate::observability::OperationTimer;
use crate::shutdown::CancellationToken;

enum StepFailure {
    Cancelled,
    Api(GitHubError),
}

impl StepFailure {
    fn into_result(self, step: RolloutStep) -> RolloutResult {
        let cause = match self {
            StepFailure::Cancelled => "cancelled".to_string(),
            StepFailure::Api(e) if e.is_conflict() => {
                return RolloutResult::HaltedAlreadyExists { step };
            }
            StepFailure::Api(e) => e.to_string(),
        };
        RolloutResult::Failed { step, cause }
    }
}

/// Applies the rollout steps to one repository at a time.
///
/// Steps run strictly in order and the first failure ends the repository's rollout.
/// Branch, file and pull request creation each refuse to overwrite an existing
/// resource, so rerunning a half-finished rollout stops at the step that already
/// happened instead of duplicating it.
#[derive(Debug, Clone)]
pub struct RolloutMachine {
    client: GitHubClient,
    workflow_path: PathBuf,
    workflow_file_name: String,
    rollback_on_failure: bool,
    dry_run: bool,
    cancel: CancellationToken,
}

impl RolloutMachine {
    pub fn new(client: GitHubClient, workflow_path: impl Into<PathBuf>) -> Self {
        let workflow_path = workflow_path.into();
        let workflow_file_name = workflow_file_name(&workflow_path);
        Self {
            client,
            workflow_path,
            workflow_file_name,
            rollback_on_failure: false,
            dry_run: false,
            cancel: CancellationToken::never(),
        }
    }

    /// Delete the rollout branch when committing or opening the pull request fails.
    pub fn with_rollback_on_failure(mut self, rollback_on_failure: bool) -> Self {
        self.rollback_on_failure = rollback_on_failure;
        self
    }

    /// Stop after the read-only checks.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    async fn attempt<T, F>(&self, step: RolloutStep, repo: &Repository, operation: F) -> Result<T, StepFailure>
    where
        F: Future<Output = Result<T, GitHubError>>,
    {
        if self.cancel.is_cancelled() {
            warn!(repository = %repo.full_name, %step, "Rollout cancelled");
            return Err(StepFailure::Cancelled);
        }

        let timer = OperationTimer::new(&format!("{step} {}", repo.full_name));
        let result = operation.await;
        timer.finish();

        result.map_err(|e| {
            warn!(repository = %repo.full_name, %step, error = %e, "Rollout step failed");
            StepFailure::Api(e)
        })
    }

    /// Run language check, presence check, branch create, file commit and pull
    /// request open against `repo`.
    pub async fn run(&self, repo: Repository) -> RolloutRecord {
        let mut record = RolloutRecord::new(&repo.full_name);

        let languages = match self
            .attempt(
                RolloutStep::LanguageCheck,
                &repo,
                self.client.repos().get_codeql_languages(&repo),
            )
            .await
        {
            Ok(languages) => languages,
            Err(failure) => {
                record.push(failure.into_result(RolloutStep::LanguageCheck));
                return record;
            }
        };
        if languages.is_empty() {
            info!(repository = %repo.full_name, "No CodeQL supported language, skipping");
            record.push(RolloutResult::SkippedNoSupportedLanguage);
            return record;
        }
        record.languages = languages.clone();

        match self
            .attempt(
                RolloutStep::WorkflowPresenceCheck,
                &repo,
                self.client
                    .contents()
                    .does_codeql_workflow_exist(&repo, &self.workflow_file_name),
            )
            .await
        {
            Ok(true) => {
                info!(repository = %repo.full_name, "Workflow already present, skipping");
                record.push(RolloutResult::SkippedAlreadyPresent);
                return record;
            }
            Ok(false) => {}
            Err(failure) => {
                record.push(failure.into_result(RolloutStep::WorkflowPresenceCheck));
                return record;
            }
        }

        if self.dry_run {
            record.push(RolloutResult::WouldRollOut { languages });
            return record;
        }

        match self
            .attempt(
                RolloutStep::BranchCreate,
                &repo,
                self.client.branches().create_branch_for_repo(&repo),
            )
            .await
        {
            Ok(reference) => record.push(RolloutResult::BranchCreated { reference }),
            Err(failure) => {
                record.push(failure.into_result(RolloutStep::BranchCreate));
                return record;
            }
        }

        match self
            .attempt(
                RolloutStep::FileCommit,
                &repo,
                self.client
                    .contents()
                    .create_workflow_file(&repo, &self.workflow_path),
            )
            .await
        {
            Ok(file) => record.push(RolloutResult::FileCommitted { file }),
            Err(failure) => {
                record.push(failure.into_result(RolloutStep::FileCommit));
                self.roll_back(&repo, &mut record).await;
                return record;
            }
        }

        match self
            .attempt(
                RolloutStep::PullRequestOpen,
                &repo,
                self.client.pulls().raise_pull_request(&repo),
            )
            .await
        {
            Ok(url) => {
                info!(repository = %repo.full_name, %url, "✅ Rollout pull request opened");
                record.push(RolloutResult::PullRequestOpened { url });
            }
            Err(StepFailure::Api(e)) if e.is_conflict() => {
                info!(repository = %repo.full_name, "Pull request already open");
                record.push(RolloutResult::PullRequestAlreadyOpen);
            }
            Err(failure) => {
                record.push(failure.into_result(RolloutStep::PullRequestOpen));
                self.roll_back(&repo, &mut record).await;
            }
        }

        record
    }

    async fn roll_back(&self, repo: &Repository, record: &mut RolloutRecord) {
        if !self.rollback_on_failure || !record.is_failure() {
            return;
        }
        match self.client.branches().delete_branch(repo).await {
            Ok(()) => record.push(RolloutResult::RolledBack),
            Err(e) => {
                warn!(repository = %repo.full_name, error = %e, "Rollback failed");
                record.push(RolloutResult::Failed {
                    step: RolloutStep::BranchDelete,
                    cause: e.to_string(),
                });
            }
        }
    }

    /// Compensating step: delete the rollout branch.
    ///
    /// Without `force` the branch is only removed when its pull request was closed
    /// without merging, was merged, or never existed; an open request keeps it.
    pub async fn cleanup(&self, repo: Repository, force: bool) -> RolloutRecord {
        let mut record = RolloutRecord::new(&repo.full_name);

        if !force {
            match self
                .attempt(
                    RolloutStep::BranchDelete,
                    &repo,
                    self.client.pulls().find_rollout_pull_request(&repo),
                )
                .await
            {
                Ok(Some(pr)) if pr.is_open() => {
                    info!(repository = %repo.full_name, url = %pr.html_url, "Pull request still open, keeping branch");
                    record.push(RolloutResult::KeptOpenPullRequest { url: pr.html_url });
                    return record;
                }
                Ok(Some(pr)) if pr.is_rejected() => {
                    info!(repository = %repo.full_name, url = %pr.html_url, "Pull request was closed unmerged");
                }
                Ok(Some(pr)) => {
                    info!(repository = %repo.full_name, url = %pr.html_url, "Pull request was merged");
                }
                Ok(None) => {}
                Err(failure) => {
                    record.push(failure.into_result(RolloutStep::BranchDelete));
                    return record;
                }
            }
        }

        match self
            .attempt(
                RolloutStep::BranchDelete,
                &repo,
                self.client.branches().delete_branch(&repo),
            )
            .await
        {
            Ok(()) => record.push(RolloutResult::RolledBack),
            Err(failure) => record.push(failure.into_result(RolloutStep::BranchDelete)),
        }
        record
    }
}

fn workflow_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("codeql.yml")
        .to_string()
}
