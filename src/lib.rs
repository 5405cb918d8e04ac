// add-files library - CodeQL workflow rollout across GitHub organisations
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod github;
pub mod http;
pub mod observability;
pub mod rollout;
pub mod shutdown;
pub mod telemetry;

// Re-export key types for easy access
pub use config::AddFilesConfig;
pub use github::{GitHubClient, GitHubError, Repository};
pub use http::{RateLimitedHttpClient, RestTransport};
pub use observability::{ApiMetrics, OperationTimer};
pub use rollout::{RolloutMachine, RolloutOrchestrator, RolloutReport, RolloutResult, RolloutStep};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use telemetry::{generate_run_id, init_telemetry};
