//! AirSense: airborne sensor capture and liability settlement
//!
//! Two agents connected only through the content store and the message
//! transport.
//!
//! ## Architecture
//!
//! - **Capture Agent**: reassembles sensor frames from a serial byte stream,
//!   stamps them with the vehicle pose, buffers them while airborne and
//!   flushes each flight's batch to disk and the content store on landing
//! - **Settlement Agent**: answers matching auction asks with a bid and
//!   finishes the liability once per announced batch
//! - **Clients**: IPFS, Ethereum JSON-RPC, liability and publisher adapters
//! - **API**: HTTP/JSON event ingress for both agents

pub mod acquisition;
pub mod api;
pub mod capture;
pub mod clients;
pub mod config;
pub mod settlement;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::AgentConfig;

// Re-export commonly used types
pub use types::{
    AuctionAsk, Batch, Bid, ContentAnnouncement, ContentId, FlightPhase, FlightStatus, Pose,
    TelemetryFrame,
};

// Re-export agents
pub use capture::{BatchFlusher, CaptureActor, CaptureHandle, TelemetryCapture};
pub use settlement::{SettlementActor, SettlementAgent, SettlementDispatcher, SettlementSlot};

/// An agent's event loop has exited and no longer accepts events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("agent event loop has stopped")]
pub struct AgentStopped;
