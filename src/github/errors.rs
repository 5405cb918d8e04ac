use octocrab::Error as OctocrabError;
use thiserror::Error;

/// Errors produced while talking to the GitHub REST API.
///
/// Classification follows what a retrying caller needs to know: `NotFound` and
/// `AlreadyExists` are distinct from a generic `Api` failure so a rerun of a partially
/// applied rollout can tell "nothing to do" apart from "real failure".
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub token not found: {0}")]
    TokenNotFound(String),

    #[error("GitHub authentication failed: {0}")]
    Authentication(String),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    #[error("GitHub API returned HTTP {status} for {method} {path}: {message}")]
    Api {
        status: u16,
        method: String,
        path: String,
        message: String,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pagination starting at {path} exceeded {max_pages} pages")]
    PaginationLimit { path: String, max_pages: u32 },

    #[error("operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("GitHub transport error: {0}")]
    Transport(#[from] OctocrabError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitHubError {
    /// HTTP status carried by the error, if it came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Api { status, .. } => Some(*status),
            GitHubError::NotFound { .. } => Some(404),
            GitHubError::Authentication(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound { .. })
            || matches!(self, GitHubError::Api { status: 404, .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GitHubError::AlreadyExists { .. })
    }

    /// Errors that must abort a whole run before any repository is touched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GitHubError::TokenNotFound(_)
                | GitHubError::Authentication(_)
                | GitHubError::InvalidName { .. }
        )
    }

    /// Reclassify an `Api` error: `not_found` statuses become `NotFound`,
    /// `conflict` statuses become `AlreadyExists`. Other errors pass through.
    pub fn classify(self, resource: &str, not_found: &[u16], conflict: &[u16]) -> Self {
        match self {
            GitHubError::Api { status, .. } if not_found.contains(&status) => {
                GitHubError::NotFound {
                    resource: resource.to_string(),
                }
            }
            GitHubError::Api { status, .. } if conflict.contains(&status) => {
                GitHubError::AlreadyExists {
                    resource: resource.to_string(),
                }
            }
            other => other,
        }
    }

    /// Multi-line hints printed alongside fatal errors on the command line.
    pub fn troubleshooting(&self) -> &'static str {
        match self {
            GitHubError::TokenNotFound(_) => {
                "🔧 QUICK FIXES:\n   → Use GitHub CLI: gh auth login\n   → Or export GH_TOKEN=your_token\n   → Create token at: https://github.com/settings/tokens (needs 'repo' and 'workflow' scopes)"
            }
            GitHubError::Authentication(_) => {
                "🔧 AUTHENTICATION FAILED:\n   → Token is invalid or expired\n   → Run: gh auth login\n   → Or export GH_TOKEN=\"$(gh auth token)\""
            }
            GitHubError::InvalidName { .. } => {
                "🔧 NAMING:\n   → Organisations use letters, digits and single hyphens\n   → Repositories are given as owner/name"
            }
            GitHubError::NotFound { .. } | GitHubError::Api { status: 404, .. } => {
                "🔧 RESOURCE NOT FOUND:\n   → The organisation or repository may not exist or be private\n   → Verify access: gh repo view owner/name"
            }
            GitHubError::Api { status: 403, .. } => {
                "🔧 PERMISSION DENIED:\n   → Token lacks required permissions\n   → Committing workflows needs the 'workflow' scope"
            }
            GitHubError::Timeout { .. } | GitHubError::Transport(_) => {
                "🔧 NETWORK:\n   → Test connection: curl -I https://api.github.com\n   → GitHub status: https://www.githubstatus.com"
            }
            _ => {
                "🔧 TROUBLESHOOTING:\n   → Check authentication: gh auth status\n   → Check rate limits: gh api rate_limit"
            }
        }
    }
}
