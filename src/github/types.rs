use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::errors::GitHubError;

/// Branch every rollout commits to.
pub const ROLLOUT_BRANCH: &str = "gh-cli/codescanningworkflow";
/// Fully qualified ref of [`ROLLOUT_BRANCH`].
pub const ROLLOUT_REF: &str = "refs/heads/gh-cli/codescanningworkflow";
/// Directory the workflow file is committed into.
pub const WORKFLOW_DIR: &str = ".github/workflows";

/// Languages CodeQL can analyse, using GitHub's linguist names.
/// Results of the language check follow this order.
pub const CODEQL_LANGUAGES: &[&str] = &[
    "C",
    "C#",
    "C++",
    "Go",
    "Java",
    "JavaScript",
    "Kotlin",
    "Python",
    "Ruby",
    "Swift",
    "TypeScript",
];

static ORGANIZATION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9]|-[A-Za-z0-9]){0,38}$").expect("valid regex")
});

static REPOSITORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("valid regex"));

/// A hosted repository as returned by the `repos` endpoints.
///
/// `full_name` is always `"<owner>/" + name`; API calls are addressed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Repository {
    pub full_name: String,
    pub name: String,
    pub default_branch: String,
}

impl Repository {
    pub fn new(full_name: &str, default_branch: &str) -> Result<Self, GitHubError> {
        let (_, name) = validate_full_name(full_name)?;
        Ok(Self {
            full_name: full_name.to_string(),
            name: name.to_string(),
            default_branch: default_branch.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        self.full_name
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or_default()
    }
}

/// Percent-encode a branch name for a URL path, keeping `/` between its segments.
pub fn encode_ref_path(branch: &str) -> String {
    branch
        .split('/')
        .map(|segment| url::form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-encode a branch name for a `ref=` query value.
pub fn encode_ref_query(branch: &str) -> String {
    url::form_urlencoded::byte_serialize(branch.as_bytes()).collect()
}

/// Continuation extracted from a `Link` response header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLink {
    pub url: String,
    pub present: bool,
}

impl PageLink {
    pub fn next(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            present: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

/// A git reference from `repos/<full>/git/ref(s)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub reference: String,
    pub object: GitObject,
}

/// A file record from the contents API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentRecord {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentWriteResponse {
    pub content: ContentRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestHead {
    #[serde(rename = "ref")]
    pub reference: String,
}

/// A pull request record, reduced to what the rollout needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestRecord {
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    pub head: PullRequestHead,
}

impl PullRequestRecord {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    /// Closed without being merged.
    pub fn is_rejected(&self) -> bool {
        self.state == "closed" && self.merged_at.is_none()
    }
}

/// Check an organisation login against GitHub's naming rules.
pub fn validate_organization_name(name: &str) -> Result<&str, GitHubError> {
    if ORGANIZATION_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(GitHubError::InvalidName {
            name: name.to_string(),
            reason: "organisation names are 1-39 letters, digits or single inner hyphens"
                .to_string(),
        })
    }
}

/// Split and check an `owner/name` pair.
pub fn validate_full_name(full_name: &str) -> Result<(&str, &str), GitHubError> {
    let invalid = |reason: &str| GitHubError::InvalidName {
        name: full_name.to_string(),
        reason: reason.to_string(),
    };

    let (owner, name) = full_name
        .split_once('/')
        .ok_or_else(|| invalid("expected owner/name"))?;
    validate_organization_name(owner).map_err(|_| invalid("owner is not a valid login"))?;
    if !REPOSITORY_NAME.is_match(name) || name == "." || name == ".." {
        return Err(invalid("repository name contains unsupported characters"));
    }
    Ok((owner, name))
}
