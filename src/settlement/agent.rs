//! SettlementAgent - auction bids and content announcements
//!
//! Answers asks for the configured model/token with a bid whose deadline is
//! an absolute block number, and records announced content ids in the
//! settlement slot for the dispatcher.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::slot::SettlementSlot;
use crate::clients::{ChainClient, ClientError, Publisher};
use crate::types::{AuctionAsk, Bid, ContentId};

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("block height unavailable: {0}")]
    Chain(#[source] ClientError),
    #[error("bid not published: {0}")]
    Publish(#[source] ClientError),
}

/// Model/token pair this agent bids for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidTerms {
    pub model: String,
    pub token: String,
    /// Bid validity in blocks
    pub bid_lifetime: u64,
}

impl BidTerms {
    pub fn matches(&self, ask: &AuctionAsk) -> bool {
        ask.model == self.model && ask.token == self.token
    }
}

pub struct SettlementAgent {
    terms: BidTerms,
    chain: Arc<dyn ChainClient>,
    publisher: Arc<dyn Publisher>,
    slot: Arc<SettlementSlot>,
    bids_sent: u64,
    asks_ignored: u64,
    superseded: u64,
}

impl SettlementAgent {
    pub fn new(
        terms: BidTerms,
        chain: Arc<dyn ChainClient>,
        publisher: Arc<dyn Publisher>,
        slot: Arc<SettlementSlot>,
    ) -> Self {
        Self {
            terms,
            chain,
            publisher,
            slot,
            bids_sent: 0,
            asks_ignored: 0,
            superseded: 0,
        }
    }

    pub fn terms(&self) -> &BidTerms {
        &self.terms
    }

    pub fn slot(&self) -> &Arc<SettlementSlot> {
        &self.slot
    }

    /// Bid on a matching ask.
    ///
    /// Reads the block height once and publishes exactly one bid. A
    /// non-matching ask makes no external call and yields `Ok(None)`.
    pub async fn on_ask(&mut self, ask: &AuctionAsk) -> Result<Option<Bid>, SettlementError> {
        if !self.terms.matches(ask) {
            self.asks_ignored += 1;
            debug!(model = %ask.model, token = %ask.token, "Ask ignored, model/token mismatch");
            return Ok(None);
        }

        let height = self
            .chain
            .current_block_height()
            .await
            .map_err(SettlementError::Chain)?;
        let bid = Bid::for_ask(ask, height, self.terms.bid_lifetime);

        self.publisher
            .publish_bid(&bid)
            .await
            .map_err(SettlementError::Publish)?;

        self.bids_sent += 1;
        info!(
            objective = %bid.objective,
            cost = bid.cost,
            block_height = height,
            deadline = bid.deadline,
            "💰 Bid published"
        );
        Ok(Some(bid))
    }

    /// Record a flushed batch for settlement.
    ///
    /// Returns the unsettled id this one replaced.
    pub fn on_content_announced(&mut self, id: ContentId) -> Option<ContentId> {
        info!(content_id = %id, "Content announced, settlement pending");
        let superseded = self.slot.mark_ready(id);
        if let Some(ref old) = superseded {
            self.superseded += 1;
            warn!(content_id = %old, "Unsettled content id superseded, it will not be settled");
        }
        superseded
    }

    pub fn bids_sent(&self) -> u64 {
        self.bids_sent
    }

    pub fn asks_ignored(&self) -> u64 {
        self.asks_ignored
    }

    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FixedChain {
        height: Option<u64>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChainClient for FixedChain {
        async fn current_block_height(&self) -> Result<u64, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.height
                .ok_or_else(|| ClientError::Protocol("node syncing".into()))
        }
    }

    #[derive(Default)]
    struct BidLog {
        bids: Mutex<Vec<Bid>>,
    }

    #[async_trait]
    impl Publisher for BidLog {
        async fn publish_content(&self, _content_id: &ContentId) -> Result<(), ClientError> {
            Ok(())
        }

        async fn publish_bid(&self, bid: &Bid) -> Result<(), ClientError> {
            self.bids.lock().unwrap().push(bid.clone());
            Ok(())
        }
    }

    fn agent(height: Option<u64>) -> (SettlementAgent, Arc<FixedChain>, Arc<BidLog>) {
        let chain = Arc::new(FixedChain {
            height,
            calls: AtomicU32::new(0),
        });
        let publisher = Arc::new(BidLog::default());
        let terms = BidTerms {
            model: "m1".into(),
            token: "t1".into(),
            bid_lifetime: 10,
        };
        let agent = SettlementAgent::new(
            terms,
            chain.clone(),
            publisher.clone(),
            Arc::new(SettlementSlot::new()),
        );
        (agent, chain, publisher)
    }

    fn ask(model: &str, token: &str) -> AuctionAsk {
        AuctionAsk {
            model: model.into(),
            token: token.into(),
            objective: "o".into(),
            cost: 5,
        }
    }

    #[tokio::test]
    async fn test_matching_ask_bids_once() {
        let (mut agent, chain, publisher) = agent(Some(100));
        let bid = agent.on_ask(&ask("m1", "t1")).await.unwrap().expect("bid");

        assert_eq!(bid.deadline, 110);
        assert_eq!(bid.lighthouse_fee, 0);
        assert_eq!(bid.cost, 5);
        assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*publisher.bids.lock().unwrap(), vec![bid]);
        assert_eq!(agent.bids_sent(), 1);
    }

    #[tokio::test]
    async fn test_mismatched_ask_makes_no_calls() {
        let (mut agent, chain, publisher) = agent(Some(100));
        assert_eq!(agent.on_ask(&ask("m2", "t1")).await.unwrap(), None);
        assert_eq!(agent.on_ask(&ask("m1", "t2")).await.unwrap(), None);

        assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
        assert!(publisher.bids.lock().unwrap().is_empty());
        assert_eq!(agent.asks_ignored(), 2);
    }

    #[tokio::test]
    async fn test_chain_failure_publishes_nothing() {
        let (mut agent, _chain, publisher) = agent(None);
        let err = agent.on_ask(&ask("m1", "t1")).await.unwrap_err();
        assert!(matches!(err, SettlementError::Chain(_)));
        assert!(publisher.bids.lock().unwrap().is_empty());
    }

    #[test]
    fn test_announcements_supersede() {
        let (mut agent, _, _) = agent(Some(1));
        assert_eq!(agent.on_content_announced(ContentId::new("Qm1")), None);
        assert_eq!(
            agent.on_content_announced(ContentId::new("Qm2")),
            Some(ContentId::new("Qm1"))
        );
        assert_eq!(agent.superseded(), 1);
        assert_eq!(agent.slot().take(), Some(ContentId::new("Qm2")));
    }
}
