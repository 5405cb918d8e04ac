use anyhow::Result;

use super::{Command, CommandContext, RolloutOptions};
use crate::github::types::validate_organization_name;
use crate::rollout::RolloutReport;

/// `add-files code-scanning`: roll out across an organisation
#[derive(Debug, Clone)]
pub struct CodeScanningCommand {
    pub organization: String,
    pub options: RolloutOptions,
}

impl CodeScanningCommand {
    pub fn new(organization: &str, options: RolloutOptions) -> Self {
        Self {
            organization: organization.to_string(),
            options,
        }
    }
}

impl Command for CodeScanningCommand {
    async fn execute(&self, context: &CommandContext) -> Result<RolloutReport> {
        validate_organization_name(&self.organization)?;
        let orchestrator = context.rollout_orchestrator(&self.options)?;

        if self.options.dry_run {
            println!("🔍 Dry run: checking repositories in {}", self.organization);
        } else {
            println!(
                "🚀 Rolling out {} to {}",
                self.options.workflow_path.display(),
                self.organization
            );
        }

        Ok(orchestrator.roll_out_organization(&self.organization).await?)
    }
}
