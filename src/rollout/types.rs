use serde::Serialize;
use std::fmt;

/// The steps applied to one repository, in order. `BranchDelete` is the
/// compensating step and only runs when asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolloutStep {
    LanguageCheck,
    WorkflowPresenceCheck,
    BranchCreate,
    FileCommit,
    PullRequestOpen,
    BranchDelete,
}

impl fmt::Display for RolloutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RolloutStep::LanguageCheck => "language check",
            RolloutStep::WorkflowPresenceCheck => "workflow presence check",
            RolloutStep::BranchCreate => "branch create",
            RolloutStep::FileCommit => "file commit",
            RolloutStep::PullRequestOpen => "pull request open",
            RolloutStep::BranchDelete => "branch delete",
        };
        f.write_str(name)
    }
}

/// What happened to a repository at one point of its rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum RolloutResult {
    SkippedAlreadyPresent,
    SkippedNoSupportedLanguage,
    /// Dry run stopped after the read-only checks.
    WouldRollOut { languages: Vec<String> },
    BranchCreated { reference: String },
    FileCommitted { file: String },
    PullRequestOpened { url: String },
    PullRequestAlreadyOpen,
    /// Cleanup left the branch alone because its pull request is still open.
    KeptOpenPullRequest { url: String },
    /// A rerun found what `step` would create already in place and stopped there.
    HaltedAlreadyExists { step: RolloutStep },
    Failed { step: RolloutStep, cause: String },
    RolledBack,
}

impl fmt::Display for RolloutResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloutResult::SkippedAlreadyPresent => write!(f, "skipped, workflow already present"),
            RolloutResult::SkippedNoSupportedLanguage => {
                write!(f, "skipped, no CodeQL supported language")
            }
            RolloutResult::WouldRollOut { languages } => {
                write!(f, "would roll out ({})", languages.join(", "))
            }
            RolloutResult::BranchCreated { reference } => write!(f, "created {reference}"),
            RolloutResult::FileCommitted { file } => write!(f, "committed {file}"),
            RolloutResult::PullRequestOpened { url } => write!(f, "opened {url}"),
            RolloutResult::PullRequestAlreadyOpen => write!(f, "pull request already open"),
            RolloutResult::KeptOpenPullRequest { url } => {
                write!(f, "kept branch, pull request still open: {url}")
            }
            RolloutResult::HaltedAlreadyExists { step } => {
                write!(f, "halted at {step}, already exists")
            }
            RolloutResult::Failed { step, cause } => write!(f, "failed at {step}: {cause}"),
            RolloutResult::RolledBack => write!(f, "rollout branch deleted"),
        }
    }
}

/// Everything that happened to one repository; the last entry is the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutRecord {
    pub full_name: String,
    pub languages: Vec<String>,
    pub history: Vec<RolloutResult>,
}

impl RolloutRecord {
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            languages: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn push(&mut self, result: RolloutResult) {
        self.history.push(result);
    }

    /// Final result; `None` only before the first step ran.
    pub fn outcome(&self) -> Option<&RolloutResult> {
        self.history.last()
    }

    /// A failure anywhere in the history, even if a rollback followed. Halting on
    /// an existing resource is not a failure.
    pub fn is_failure(&self) -> bool {
        self.history
            .iter()
            .any(|result| matches!(result, RolloutResult::Failed { .. }))
    }

    pub fn failed_step(&self) -> Option<RolloutStep> {
        self.history.iter().find_map(|result| match result {
            RolloutResult::Failed { step, .. } => Some(*step),
            _ => None,
        })
    }

    pub fn pull_request_url(&self) -> Option<&str> {
        self.history.iter().find_map(|result| match result {
            RolloutResult::PullRequestOpened { url } => Some(url.as_str()),
            _ => None,
        })
    }
}
