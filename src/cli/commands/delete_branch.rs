use anyhow::Result;

use super::{Command, CommandContext};
use crate::github::types::validate_organization_name;
use crate::github::ROLLOUT_BRANCH;
use crate::rollout::{RolloutMachine, RolloutOrchestrator, RolloutReport};

/// Where `delete-branch` looks for rollout branches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Repositories(Vec<String>),
    Organization(String),
}

/// `add-files delete-branch`: the compensating step for rejected or abandoned rollouts
#[derive(Debug, Clone)]
pub struct DeleteBranchCommand {
    pub target: DeleteTarget,
    pub force: bool,
    pub concurrency: usize,
}

impl DeleteBranchCommand {
    pub fn new(target: DeleteTarget, force: bool, concurrency: usize) -> Self {
        Self {
            target,
            force,
            concurrency,
        }
    }
}

impl Command for DeleteBranchCommand {
    async fn execute(&self, context: &CommandContext) -> Result<RolloutReport> {
        // The workflow template plays no part in deleting branches.
        let machine = RolloutMachine::new(context.client.clone(), "codeql.yml")
            .with_cancellation(context.cancel.clone());
        let orchestrator =
            RolloutOrchestrator::new(machine, self.concurrency, context.run_id.clone());

        match &self.target {
            DeleteTarget::Repositories(full_names) => {
                println!(
                    "🧹 Deleting {ROLLOUT_BRANCH} from {} repositories",
                    full_names.len()
                );
                Ok(orchestrator
                    .clean_up_repositories(full_names, self.force)
                    .await)
            }
            DeleteTarget::Organization(organization) => {
                validate_organization_name(organization)?;
                println!("🧹 Deleting {ROLLOUT_BRANCH} across {organization}");
                Ok(orchestrator
                    .clean_up_organization(organization, self.force)
                    .await?)
            }
        }
    }
}
