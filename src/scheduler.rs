use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::service::ResolutionService;

/// Handle to the periodic purge task. The loop runs until
/// [`PurgeScheduler::shutdown`] is called; dropping the handle alone does
/// not stop it.
pub struct PurgeScheduler {
    shutdown_tx: watch::Sender<bool>,
}

impl PurgeScheduler {
    /// Spawn the purge loop. The first run happens one full interval after
    /// startup and the cadence is fixed from then on.
    pub fn spawn(service: Arc<ResolutionService>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            // Skip the first tick which fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match service.purge_expired().await {
                            Ok(outcome) => {
                                info!(
                                    links = outcome.links_deleted,
                                    events = outcome.events_deleted,
                                    "purge run finished"
                                );
                            }
                            Err(err) => {
                                error!(error = %err, "purge run failed");
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("purge scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        });

        Self { shutdown_tx }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
