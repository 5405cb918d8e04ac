pub mod api;
pub mod branches;
pub mod client;
pub mod contents;
pub mod errors;
pub mod pulls;
pub mod repos;
pub mod types;

pub use api::{find_next_page, ApiClient, ApiResponse};
pub use client::{ClientOptions, GitHubClient};
pub use errors::GitHubError;
pub use types::{PageLink, PullRequestRecord, Repository, ROLLOUT_BRANCH, ROLLOUT_REF};
