//! Telemetry capture agent
//!
//! - [`state`]: flight-phase gated buffering (pure state machine)
//! - [`flush`]: file write, upload and announcement of sealed batches
//! - [`actor`]: the event loop tying sensor bytes, events and ticks together

pub mod actor;
pub mod flush;
pub mod state;

pub use actor::{CaptureActor, CaptureEvent, CaptureHandle, CaptureSummary};
pub use flush::{BatchFlusher, FlushError, FlushReport};
pub use state::{CaptureStatus, PhaseChange, TelemetryCapture, TickOutcome};
