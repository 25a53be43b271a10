//! Shared data structures for the airborne capture and settlement agents
//!
//! - Telemetry: Pose, TelemetryFrame, FlightStatus, FlightPhase, Batch
//! - Auction: AuctionAsk, Bid, ContentId

mod telemetry;
mod auction;

pub use telemetry::*;
pub use auction::*;
