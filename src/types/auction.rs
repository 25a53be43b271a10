//! Auction and settlement types: AuctionAsk, Bid, ContentId

use serde::{Deserialize, Serialize};

/// Identifier returned by the content-addressable store for an uploaded batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-identifier announcement exchanged between the two agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnnouncement {
    pub content_id: ContentId,
}

/// Incoming auction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionAsk {
    pub model: String,
    pub token: String,
    pub objective: String,
    pub cost: u64,
}

/// Response to a matching ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub model: String,
    pub objective: String,
    pub token: String,
    pub cost: u64,
    pub lighthouse_fee: u64,
    /// Absolute block number after which the bid expires
    pub deadline: u64,
}

impl Bid {
    /// Build a bid answering `ask`, expiring `lifetime` blocks after `block_height`.
    pub fn for_ask(ask: &AuctionAsk, block_height: u64, lifetime: u64) -> Self {
        Self {
            model: ask.model.clone(),
            objective: ask.objective.clone(),
            token: ask.token.clone(),
            cost: ask.cost,
            lighthouse_fee: 0,
            deadline: block_height.saturating_add(lifetime),
        }
    }
}
