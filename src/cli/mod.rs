use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AddFilesConfig;
use crate::github::GitHubClient;
use crate::shutdown::ShutdownCoordinator;
use crate::telemetry::{generate_run_id, init_telemetry};

pub mod commands;

use commands::{
    CodeScanningCommand, CodeScanningRepoCommand, Command, CommandContext, DeleteBranchCommand,
    DeleteTarget, RolloutOptions,
};

#[derive(Parser, Debug)]
#[command(name = "add-files")]
#[command(about = "Add code scanning workflows to your organisation in GitHub")]
#[command(long_about = "A GH-CLI extension that allows you to add code scanning workflows to your organisation in GitHub. \
                       Each repository gets a gh-cli/codescanningworkflow branch, the workflow file and a pull request \
                       against its default branch.")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML) layered over add-files.toml and .add-files-rc
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a JSON report of every repository's outcome
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Roll the CodeQL workflow out to every repository of an organisation
    CodeScanning {
        /// Organisation whose repositories receive the workflow
        #[arg(short, long)]
        org: String,
        #[command(flatten)]
        options: RolloutArgs,
    },
    /// Delete the rollout branch from repositories, e.g. after a rejected pull request
    DeleteBranch {
        /// Repository as owner/name (repeatable)
        #[arg(
            short,
            long = "repo",
            value_name = "OWNER/NAME",
            required_unless_present = "org",
            conflicts_with = "org"
        )]
        repos: Vec<String>,
        /// Delete the branch everywhere it exists in this organisation
        #[arg(short, long)]
        org: Option<String>,
        /// Delete even when the pull request is still open
        #[arg(long)]
        force: bool,
        /// Repositories processed at the same time
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Roll the CodeQL workflow out to a single repository
    CodeScanningRepo {
        /// Repository as owner/name
        #[arg(short, long, value_name = "OWNER/NAME")]
        repo: String,
        #[command(flatten)]
        options: RolloutArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RolloutArgs {
    /// Workflow template to commit (defaults to rollout.workflow_path)
    #[arg(short, long, value_name = "PATH")]
    pub workflow: Option<PathBuf>,
    /// Repositories processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Only run the read-only checks and report what would change
    #[arg(long)]
    pub dry_run: bool,
    /// Delete the rollout branch when a later step fails
    #[arg(long)]
    pub rollback_on_failure: bool,
}

impl RolloutArgs {
    fn resolve(&self, config: &AddFilesConfig) -> RolloutOptions {
        RolloutOptions {
            workflow_path: self
                .workflow
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.rollout.workflow_path)),
            concurrency: self.concurrency.unwrap_or(config.rollout.concurrency),
            dry_run: self.dry_run,
            rollback_on_failure: self.rollback_on_failure || config.rollout.rollback_on_failure,
        }
    }
}

/// Load configuration, authenticate, and run the selected command.
///
/// Returns `Ok(true)` when every repository succeeded, `Ok(false)` when at least
/// one failed, and `Err` for fatal errors that stopped the run up front.
pub async fn dispatch(cli: Cli) -> Result<bool> {
    AddFilesConfig::load_env_file()?;
    let mut config = AddFilesConfig::load(cli.config.as_deref())?;
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    init_telemetry(&config.observability)?;

    let client = GitHubClient::from_config(&config)?;
    client.api().verify_authentication().await?;

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    let context = CommandContext {
        client,
        run_id: generate_run_id(),
        cancel: shutdown.token(),
    };

    let report = match &cli.command {
        Commands::CodeScanning { org, options } => {
            CodeScanningCommand::new(org, options.resolve(&config))
                .execute(&context)
                .await?
        }
        Commands::CodeScanningRepo { repo, options } => {
            CodeScanningRepoCommand::new(repo, options.resolve(&config))
                .execute(&context)
                .await?
        }
        Commands::DeleteBranch {
            repos,
            org,
            force,
            concurrency,
        } => {
            let target = match org {
                Some(org) => DeleteTarget::Organization(org.clone()),
                None => DeleteTarget::Repositories(repos.clone()),
            };
            DeleteBranchCommand::new(
                target,
                *force,
                concurrency.unwrap_or(config.rollout.concurrency),
            )
            .execute(&context)
            .await?
        }
    };

    print!("{}", report.render());
    if let Some(path) = &cli.report {
        report.write_json(path)?;
        println!("📝 Report written to {}", path.display());
    }
    context.client.api().metrics().log_stats();

    Ok(!report.has_failures())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_table_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_code_scanning() {
        let cli = Cli::try_parse_from([
            "add-files",
            "code-scanning",
            "--org",
            "paradisisland",
            "--workflow",
            "ci/codeql-custom.yml",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::CodeScanning { org, options } => {
                assert_eq!(org, "paradisisland");
                assert!(options.dry_run);
                let resolved = options.resolve(&AddFilesConfig::default());
                assert_eq!(resolved.workflow_path, PathBuf::from("ci/codeql-custom.yml"));
                assert_eq!(resolved.concurrency, 4);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn delete_branch_requires_a_target() {
        assert!(Cli::try_parse_from(["add-files", "delete-branch"]).is_err());
        assert!(Cli::try_parse_from([
            "add-files",
            "delete-branch",
            "--repo",
            "paradisisland/maria",
            "--org",
            "paradisisland"
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "add-files",
            "delete-branch",
            "--repo",
            "paradisisland/maria",
            "--repo",
            "paradisisland/rose",
        ])
        .unwrap();
        match cli.command {
            Commands::DeleteBranch { repos, force, .. } => {
                assert_eq!(repos, vec!["paradisisland/maria", "paradisisland/rose"]);
                assert!(!force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_workflow_path_is_the_default() {
        let mut config = AddFilesConfig::default();
        config.rollout.workflow_path = "templates/codeql.yml".to_string();
        config.rollout.rollback_on_failure = true;

        let resolved = RolloutArgs::default().resolve(&config);
        assert_eq!(resolved.workflow_path, PathBuf::from("templates/codeql.yml"));
        assert!(resolved.rollback_on_failure);
    }
}
