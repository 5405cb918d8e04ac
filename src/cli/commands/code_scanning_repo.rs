use anyhow::Result;

use super::{Command, CommandContext, RolloutOptions};
use crate::github::types::validate_full_name;
use crate::rollout::RolloutReport;

/// `add-files code-scanning-repo`: roll out to one repository
#[derive(Debug, Clone)]
pub struct CodeScanningRepoCommand {
    pub full_name: String,
    pub options: RolloutOptions,
}

impl CodeScanningRepoCommand {
    pub fn new(full_name: &str, options: RolloutOptions) -> Self {
        Self {
            full_name: full_name.to_string(),
            options,
        }
    }
}

impl Command for CodeScanningRepoCommand {
    async fn execute(&self, context: &CommandContext) -> Result<RolloutReport> {
        validate_full_name(&self.full_name)?;
        let orchestrator = context.rollout_orchestrator(&self.options)?;

        println!("🚀 Rolling out to {}", self.full_name);
        Ok(orchestrator.roll_out_repository(&self.full_name).await?)
    }
}
