//! Settlement dispatcher
//!
//! Waits on the settlement slot and calls finish-liability once per id it
//! takes. Runs as its own task; the slot is the only state it shares with
//! the agent.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::slot::SettlementSlot;
use crate::clients::retry::{with_retry, RetryPolicy};
use crate::clients::LiabilityClient;
use crate::types::ContentId;

/// Settlement counters returned when the dispatcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub settled: u64,
    pub failed: u64,
}

pub struct SettlementDispatcher {
    slot: Arc<SettlementSlot>,
    liability: Arc<dyn LiabilityClient>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl SettlementDispatcher {
    pub fn new(
        slot: Arc<SettlementSlot>,
        liability: Arc<dyn LiabilityClient>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            slot,
            liability,
            retry: RetryPolicy::none(),
            cancel,
        }
    }

    /// Retry failed finish calls according to `policy`.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Finish the liability for one id.
    ///
    /// Returns whether the call succeeded. Failures are logged only.
    /// Cancellation abandons any pending retry backoff.
    pub async fn settle(&self, id: &ContentId) -> bool {
        let liability = &self.liability;
        let attempt = with_retry(self.retry, "finish liability", || liability.finish_liability(id));
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!(content_id = %id, "Shutdown during finish liability, batch left unsettled");
                return false;
            }
            outcome = attempt => outcome,
        };

        match outcome {
            Ok(()) => {
                info!(content_id = %id, "✅ Liability finished");
                true
            }
            Err(e) => {
                error!(content_id = %id, error = %e, "Finish liability failed, batch left unsettled");
                false
            }
        }
    }

    /// Run until cancelled.
    ///
    /// The slot is cleared before each finish call, so an id is settled at
    /// most once.
    pub async fn run(self) -> DispatchStats {
        info!("[Dispatcher] Waiting for content announcements");
        let mut stats = DispatchStats::default();

        loop {
            let id = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[Dispatcher] Shutdown signal received");
                    break;
                }
                id = self.slot.wait_ready() => id,
            };

            if self.settle(&id).await {
                stats.settled += 1;
            } else {
                stats.failed += 1;
            }
        }

        info!(settled = stats.settled, failed = stats.failed, "[Dispatcher] Stopped");
        stats
    }
}
