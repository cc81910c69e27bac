//! Periodic Token Sweep Task
//!
//! Deletes revoked and expired refresh token records on a fixed interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use emporia_common::Clock;
use emporia_errors::AppResult;

use crate::domain::services::refresh_token_ledger::RefreshTokenLedger;

pub struct TokenSweepTask {
    ledger: Arc<RefreshTokenLedger>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl TokenSweepTask {
    pub fn new(ledger: Arc<RefreshTokenLedger>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            ledger,
            clock,
            interval,
        }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Token sweep task started");
            let mut ticker = interval(self.interval);
            // the first tick fires immediately, which doubles as a startup sweep

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_sweep().await {
                            error!(error = %e, "Failed to run token sweep");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Token sweep task received shutdown signal");
                        break;
                    }
                }
            }
            info!("Token sweep task stopped");
        })
    }

    async fn run_sweep(&self) -> AppResult<()> {
        let deleted = self.ledger.sweep(self.clock.now()).await?;
        if deleted > 0 {
            info!(deleted, "Swept dead refresh tokens");
        }
        Ok(())
    }
}
