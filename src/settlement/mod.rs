//! Auction and liability settlement agent
//!
//! The actor loop handles asks and announcements; the dispatcher task
//! settles whatever the slot holds. They share nothing but the slot.

pub mod actor;
pub mod agent;
pub mod dispatcher;
pub mod slot;

pub use actor::{SettlementActor, SettlementEvent, SettlementHandle};
pub use agent::{BidTerms, SettlementAgent, SettlementError};
pub use dispatcher::{DispatchStats, SettlementDispatcher};
pub use slot::SettlementSlot;
