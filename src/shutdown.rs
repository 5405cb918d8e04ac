use tokio::sync::watch;
use tracing::{info, warn};

/// Graceful shutdown coordinator for add-files
///
/// Cancellation is cooperative: rollouts check the token between steps, so the
/// request in flight completes and the remaining steps of that repository are skipped.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

/// Cheap handle observed by the workers.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    receiver: watch::Receiver<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Install a Ctrl-C handler that cancels the run
    pub fn install_signal_handlers(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupt received, finishing in-flight requests and stopping");
                    coordinator.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        });
        info!("Shutdown coordinator ready - Ctrl-C stops the rollout gracefully");
    }
}

impl CancellationToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        ShutdownCoordinator::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}
