//! Settlement Actor - serializes asks and content announcements

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::agent::SettlementAgent;
use crate::config::defaults::EVENT_CHANNEL_CAPACITY;
use crate::types::{AuctionAsk, ContentId};
use crate::AgentStopped;

/// Transport events consumed by the settlement agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementEvent {
    Ask(AuctionAsk),
    ContentAnnounced(ContentId),
}

/// Handle used by the ingress to feed the settlement loop.
#[derive(Clone)]
pub struct SettlementHandle {
    tx: mpsc::Sender<SettlementEvent>,
}

impl SettlementHandle {
    /// Queue an event, waiting for channel capacity.
    pub async fn send(&self, event: SettlementEvent) -> Result<(), AgentStopped> {
        self.tx.send(event).await.map_err(|_| AgentStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Handle wired to a bare receiver instead of an actor.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::Receiver<SettlementEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }
}

pub struct SettlementActor {
    agent: SettlementAgent,
    rx: mpsc::Receiver<SettlementEvent>,
    cancel: CancellationToken,
}

impl SettlementActor {
    pub fn new(agent: SettlementAgent, cancel: CancellationToken) -> (Self, SettlementHandle) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { agent, rx, cancel }, SettlementHandle { tx })
    }

    /// Run until cancelled or every handle is dropped. Returns the agent.
    pub async fn run(mut self) -> SettlementAgent {
        info!(
            model = %self.agent.terms().model,
            token = %self.agent.terms().token,
            bid_lifetime = self.agent.terms().bid_lifetime,
            "[Settlement] Starting"
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("[Settlement] Shutdown signal received");
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(ev) => ev,
                    None => {
                        info!("[Settlement] Event channel closed");
                        break;
                    }
                },
            };

            match event {
                SettlementEvent::Ask(ask) => {
                    if let Err(e) = self.agent.on_ask(&ask).await {
                        warn!(objective = %ask.objective, error = %e, "Ask skipped");
                    }
                }
                SettlementEvent::ContentAnnounced(id) => {
                    self.agent.on_content_announced(id);
                }
            }
        }

        info!(
            bids_sent = self.agent.bids_sent(),
            asks_ignored = self.agent.asks_ignored(),
            superseded = self.agent.superseded(),
            "[Settlement] Stopped"
        );
        self.agent
    }
}
