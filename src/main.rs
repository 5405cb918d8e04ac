use anyhow::Result;
use clap::Parser;

use gh_add_files::cli::{dispatch, Cli};
use gh_add_files::GitHubError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let outcome = tokio::runtime::Runtime::new()?.block_on(dispatch(cli));
    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ {e:#}");
            if let Some(github_error) = e.downcast_ref::<GitHubError>() {
                eprintln!("   {}", github_error.troubleshooting());
            }
            std::process::exit(1);
        }
    }
}
