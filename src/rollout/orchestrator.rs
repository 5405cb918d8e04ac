use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, Instrument};

use super::report::RolloutReport;
use super::state_machine::RolloutMachine;
use super::types::{RolloutRecord, RolloutResult, RolloutStep};
use crate::github::{GitHubError, Repository};
use crate::observability::create_rollout_span;

/// Runs the rollout over many repositories with a bounded worker pool.
///
/// Repositories are independent: every worker owns its `Repository` and all state
/// lives on GitHub, so the only shared piece is the channel collecting records.
/// One repository failing never stops the others.
#[derive(Debug, Clone)]
pub struct RolloutOrchestrator {
    machine: Arc<RolloutMachine>,
    concurrency: usize,
    run_id: String,
}

impl RolloutOrchestrator {
    pub fn new(machine: RolloutMachine, concurrency: usize, run_id: impl Into<String>) -> Self {
        Self {
            machine: Arc::new(machine),
            concurrency: concurrency.max(1),
            run_id: run_id.into(),
        }
    }

    /// Roll out to every repository of an organisation.
    ///
    /// Listing failures (unknown organisation, bad name) abort before any
    /// repository is touched.
    pub async fn roll_out_organization(
        &self,
        organization: &str,
    ) -> Result<RolloutReport, GitHubError> {
        let repos = self.machine.client().repos().get_repos(organization).await?;
        info!(organization, count = repos.len(), run_id = %self.run_id, "Starting organization rollout");
        Ok(self.run_all(repos).await)
    }

    /// Roll out to a single repository given as `owner/name`.
    pub async fn roll_out_repository(&self, full_name: &str) -> Result<RolloutReport, GitHubError> {
        let repo = self.machine.client().repos().get_repo(full_name).await?;
        Ok(self.run_all(vec![repo]).await)
    }

    pub async fn run_all(&self, repos: Vec<Repository>) -> RolloutReport {
        self.process(repos, RolloutStep::LanguageCheck, |machine, repo| async move {
            machine.run(repo).await
        })
        .await
    }

    /// Delete the rollout branch of the named repositories.
    pub async fn clean_up_repositories(&self, full_names: &[String], force: bool) -> RolloutReport {
        let mut invalid = Vec::new();
        let mut repos = Vec::new();
        for full_name in full_names {
            match Repository::new(full_name, "") {
                Ok(repo) => repos.push(repo),
                Err(e) => {
                    let mut record = RolloutRecord::new(full_name);
                    record.push(RolloutResult::Failed {
                        step: RolloutStep::BranchDelete,
                        cause: e.to_string(),
                    });
                    invalid.push(record);
                }
            }
        }

        let mut report = self.clean_up(repos, force).await;
        report.extend(invalid);
        report
    }

    /// Delete the rollout branch everywhere it exists in an organisation.
    pub async fn clean_up_organization(
        &self,
        organization: &str,
        force: bool,
    ) -> Result<RolloutReport, GitHubError> {
        let client = self.machine.client();
        let repos = client.repos().get_repos(organization).await?;

        let mut with_branch = Vec::new();
        let mut lookup_failures = Vec::new();
        for repo in repos {
            match client.branches().branch_exists(&repo).await {
                Ok(true) => with_branch.push(repo),
                Ok(false) => {}
                Err(e) => {
                    let mut record = RolloutRecord::new(&repo.full_name);
                    record.push(RolloutResult::Failed {
                        step: RolloutStep::BranchDelete,
                        cause: e.to_string(),
                    });
                    lookup_failures.push(record);
                }
            }
        }
        info!(organization, count = with_branch.len(), "Repositories with a rollout branch");

        let mut report = self.clean_up(with_branch, force).await;
        report.extend(lookup_failures);
        Ok(report)
    }

    async fn clean_up(&self, repos: Vec<Repository>, force: bool) -> RolloutReport {
        self.process(repos, RolloutStep::BranchDelete, move |machine, repo| async move {
            machine.cleanup(repo, force).await
        })
        .await
    }

    /// Run `operation` on every repository and collect one record per repository.
    ///
    /// A worker that panics is reported as failed at `first_step`.
    async fn process<F, Fut>(
        &self,
        repos: Vec<Repository>,
        first_step: RolloutStep,
        operation: F,
    ) -> RolloutReport
    where
        F: Fn(Arc<RolloutMachine>, Repository) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = RolloutRecord> + Send + 'static,
    {
        let mut report = RolloutReport::new(&self.run_id);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        let mut pending = Vec::with_capacity(repos.len());

        for repo in repos {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let machine = self.machine.clone();
            let sender = sender.clone();
            let operation = operation.clone();
            let span = create_rollout_span(&repo.full_name, &self.run_id);
            pending.push(repo.full_name.clone());

            workers.spawn(
                async move {
                    let record = operation(machine, repo).await;
                    let _ = sender.send(record);
                    drop(permit);
                }
                .instrument(span),
            );
        }
        drop(sender);

        let mut crashes = Vec::new();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Rollout worker crashed: {}", e);
                crashes.push(e.to_string());
            }
        }
        while let Some(record) = receiver.recv().await {
            pending.retain(|full_name| *full_name != record.full_name);
            report.push(record);
        }

        // Repositories still pending belong to crashed workers.
        let cause = format!("worker crashed: {}", crashes.join("; "));
        for full_name in pending {
            let mut record = RolloutRecord::new(&full_name);
            record.push(RolloutResult::Failed {
                step: first_step,
                cause: cause.clone(),
            });
            report.push(record);
        }

        report.finished_at = Utc::now();
        report.sort();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{ApiClient, ClientOptions, GitHubClient};
    use crate::http::{RateLimitedHttpClient, TransportSettings};
    use std::time::Duration;

    fn orchestrator() -> RolloutOrchestrator {
        let transport = RateLimitedHttpClient::new(TransportSettings {
            api_url: "https://api.github.com".to_string(),
            token: "test_token".to_string(),
            requests_per_second: 10,
            burst_capacity: 10,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();
        let client = GitHubClient::new(ApiClient::new(Arc::new(transport)), ClientOptions::default());
        RolloutOrchestrator::new(RolloutMachine::new(client, "codeql.yml"), 2, "run")
    }

    #[tokio::test]
    async fn crashed_worker_still_gets_a_record() {
        let repos = vec![
            Repository::new("o/maria", "main").unwrap(),
            Repository::new("o/rose", "main").unwrap(),
        ];

        let report = orchestrator()
            .process(repos, RolloutStep::LanguageCheck, |_, repo| async move {
                if repo.name == "rose" {
                    panic!("boom");
                }
                let mut record = RolloutRecord::new(&repo.full_name);
                record.push(RolloutResult::SkippedAlreadyPresent);
                record
            })
            .await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(
            report.record("o/maria").unwrap().outcome(),
            Some(&RolloutResult::SkippedAlreadyPresent)
        );
        let rose = report.record("o/rose").unwrap();
        assert_eq!(rose.failed_step(), Some(RolloutStep::LanguageCheck));
        assert!(rose.outcome().unwrap().to_string().contains("worker crashed"));
        assert!(report.has_failures());
    }
}
