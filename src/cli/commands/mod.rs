use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::github::GitHubClient;
use crate::rollout::{RolloutMachine, RolloutOrchestrator, RolloutReport};
use crate::shutdown::CancellationToken;

pub mod code_scanning;
pub mod code_scanning_repo;
pub mod delete_branch;

pub use code_scanning::CodeScanningCommand;
pub use code_scanning_repo::CodeScanningRepoCommand;
pub use delete_branch::{DeleteBranchCommand, DeleteTarget};

/// What every command runs against
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub client: GitHubClient,
    pub run_id: String,
    pub cancel: CancellationToken,
}

/// Rollout settings after merging CLI flags over configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutOptions {
    pub workflow_path: PathBuf,
    pub concurrency: usize,
    pub dry_run: bool,
    pub rollback_on_failure: bool,
}

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, context: &CommandContext) -> Result<RolloutReport>;
}

impl CommandContext {
    /// Build the orchestrator for a rollout, checking the template up front.
    pub fn rollout_orchestrator(&self, options: &RolloutOptions) -> Result<RolloutOrchestrator> {
        if !options.dry_run && !options.workflow_path.is_file() {
            bail!(
                "workflow template {} does not exist",
                options.workflow_path.display()
            );
        }

        let machine = RolloutMachine::new(self.client.clone(), options.workflow_path.clone())
            .with_dry_run(options.dry_run)
            .with_rollback_on_failure(options.rollback_on_failure)
            .with_cancellation(self.cancel.clone());
        Ok(RolloutOrchestrator::new(
            machine,
            options.concurrency,
            self.run_id.clone(),
        ))
    }
}
