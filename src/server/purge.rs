use crate::application_impl::RefreshStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Periodically drops expired refresh records until cancelled.
pub struct RefreshPurger {
    store: Arc<RefreshStore>,
    interval: Duration,
    cancellation_token: CancellationToken,
}

impl RefreshPurger {
    pub fn new(
        store: Arc<RefreshStore>,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            interval,
            cancellation_token,
        }
    }

    async fn tick_once(&self) -> anyhow::Result<()> {
        tokio::time::sleep(self.interval).await;
        let purged = self.store.purge_expired().await?;
        if purged > 0 {
            tracing::info!(purged, "expired refresh tokens purged");
        }
        Ok(())
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("RefreshPurger shutting down...");
                    break;
                }
                result = self.tick_once() => {
                    if let Err(e) = result {
                        tracing::error!("RefreshPurger error: {:#}", e);
                    }
                }
            }
        }
        Ok(())
    }
}
