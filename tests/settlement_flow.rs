//! Settlement flow integration tests
//!
//! Runs the settlement actor and dispatcher against in-memory chain,
//! publisher and liability fakes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use airsense::clients::{ChainClient, ClientError, LiabilityClient, Publisher};
use airsense::settlement::{
    BidTerms, DispatchStats, SettlementActor, SettlementAgent, SettlementDispatcher,
    SettlementEvent, SettlementSlot,
};
use airsense::types::{AuctionAsk, Bid, ContentId};

// ============================================================================
// Fakes
// ============================================================================

struct Chain {
    height: AtomicU64,
    reads: AtomicU64,
}

#[async_trait]
impl ChainClient for Chain {
    async fn current_block_height(&self) -> Result<u64, ClientError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.height.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
struct Outbox {
    bids: Mutex<Vec<Bid>>,
}

#[async_trait]
impl Publisher for Outbox {
    async fn publish_content(&self, _content_id: &ContentId) -> Result<(), ClientError> {
        Ok(())
    }

    async fn publish_bid(&self, bid: &Bid) -> Result<(), ClientError> {
        self.bids.lock().unwrap().push(bid.clone());
        Ok(())
    }
}

#[derive(Default)]
struct Liability {
    reject: bool,
    calls: Mutex<Vec<ContentId>>,
}

#[async_trait]
impl LiabilityClient for Liability {
    async fn finish_liability(&self, content_id: &ContentId) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(content_id.clone());
        if self.reject {
            Err(ClientError::Protocol("liability rejected".into()))
        } else {
            Ok(())
        }
    }
}

fn terms() -> BidTerms {
    BidTerms {
        model: "m1".into(),
        token: "t1".into(),
        bid_lifetime: 10,
    }
}

fn ask(model: &str) -> AuctionAsk {
    AuctionAsk {
        model: model.into(),
        token: "t1".into(),
        objective: "o".into(),
        cost: 5,
    }
}

fn agent_with(slot: Arc<SettlementSlot>) -> (SettlementAgent, Arc<Chain>, Arc<Outbox>) {
    let chain = Arc::new(Chain {
        height: AtomicU64::new(100),
        reads: AtomicU64::new(0),
    });
    let outbox = Arc::new(Outbox::default());
    let agent = SettlementAgent::new(terms(), chain.clone(), outbox.clone(), slot);
    (agent, chain, outbox)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_matching_ask_yields_one_bid_through_actor() {
    let slot = Arc::new(SettlementSlot::new());
    let (agent, chain, outbox) = agent_with(slot);
    let cancel = CancellationToken::new();
    let (actor, handle) = SettlementActor::new(agent, cancel.clone());
    let task = tokio::spawn(actor.run());

    handle.send(SettlementEvent::Ask(ask("m1"))).await.unwrap();
    handle.send(SettlementEvent::Ask(ask("other"))).await.unwrap();
    drop(handle);

    let agent = task.await.unwrap();
    assert_eq!(agent.bids_sent(), 1);
    assert_eq!(agent.asks_ignored(), 1);
    assert_eq!(chain.reads.load(Ordering::SeqCst), 1);

    let bids = outbox.bids.lock().unwrap();
    assert_eq!(bids.len(), 1);
    assert_eq!(
        bids[0],
        Bid {
            model: "m1".into(),
            objective: "o".into(),
            token: "t1".into(),
            cost: 5,
            lighthouse_fee: 0,
            deadline: 110,
        }
    );
}

#[tokio::test]
async fn test_rapid_announcements_settle_latest_once() {
    let slot = Arc::new(SettlementSlot::new());
    let (mut agent, _, _) = agent_with(slot.clone());

    // Both arrive before the dispatcher runs
    agent.on_content_announced(ContentId::new("QmA"));
    agent.on_content_announced(ContentId::new("QmB"));
    assert_eq!(agent.superseded(), 1);

    let liability = Arc::new(Liability::default());
    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        SettlementDispatcher::new(slot.clone(), liability.clone(), cancel.clone()).run(),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    assert_eq!(task.await.unwrap(), DispatchStats { settled: 1, failed: 0 });
    assert_eq!(*liability.calls.lock().unwrap(), vec![ContentId::new("QmB")]);
    assert!(!slot.is_ready());
}

#[tokio::test]
async fn test_announcements_through_actor_reach_dispatcher() {
    let slot = Arc::new(SettlementSlot::new());
    let (agent, _, _) = agent_with(slot.clone());
    let liability = Arc::new(Liability::default());
    let cancel = CancellationToken::new();

    let (actor, handle) = SettlementActor::new(agent, cancel.clone());
    let actor_task = tokio::spawn(actor.run());
    let dispatch_task = tokio::spawn(
        SettlementDispatcher::new(slot.clone(), liability.clone(), cancel.clone()).run(),
    );

    handle
        .send(SettlementEvent::ContentAnnounced(ContentId::new("Qm1")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle
        .send(SettlementEvent::ContentAnnounced(ContentId::new("Qm2")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    cancel.cancel();
    actor_task.await.unwrap();
    let stats = dispatch_task.await.unwrap();

    assert_eq!(stats.settled, 2);
    assert_eq!(
        *liability.calls.lock().unwrap(),
        vec![ContentId::new("Qm1"), ContentId::new("Qm2")]
    );
}

#[tokio::test]
async fn test_rejected_finish_is_not_retried() {
    let slot = Arc::new(SettlementSlot::new());
    let liability = Arc::new(Liability {
        reject: true,
        ..Liability::default()
    });
    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        SettlementDispatcher::new(slot.clone(), liability.clone(), cancel.clone()).run(),
    );

    slot.mark_ready(ContentId::new("QmX"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    assert_eq!(task.await.unwrap(), DispatchStats { settled: 0, failed: 1 });
    assert_eq!(liability.calls.lock().unwrap().len(), 1);
    assert!(!slot.is_ready());
}
