//! Sensor data acquisition module
//!
//! Handles byte ingestion from the gas-sensor board and frame reassembly.

pub mod frame;
pub mod source;

pub use frame::{FrameAssembler, FrameStep, FRAME_TERMINATOR, NOISE_BYTES};
pub use source::{stdin_source, ByteEvent, ByteSource, DeviceSource, ReaderSource, StdinSource};
