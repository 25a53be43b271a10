//! TelemetryCapture - flight-phase gated frame buffering
//!
//! Owns the flight phase, the latest pose, the frame assembler and the
//! active batch. Every method is synchronous and side-effect free apart
//! from logging; the actor loop drives it and performs the flush I/O.
//!
//! Phase rules:
//! - Grounded + in-air-standby (3) -> Airborne, collection starts
//! - Airborne + on-ground (1) -> Grounded, batch sealed on the next tick
//! - anything else leaves the phase alone

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::acquisition::{FrameAssembler, FrameStep};
use crate::types::{Batch, FlightPhase, FlightStatus, Pose, TelemetryFrame};

/// A phase transition caused by a flight status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: FlightPhase,
    pub to: FlightPhase,
}

/// What the periodic tick decided.
#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    /// Landing observed: the sealed batch must be flushed
    Flush(Batch),
    /// Grounded with stray frames held; they were dropped
    Discarded(usize),
    /// Nothing to do
    Idle,
}

/// Snapshot served by the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureStatus {
    pub phase: FlightPhase,
    pub pose: Pose,
    /// Frames in the unsealed batch
    pub batch_len: usize,
    pub flush_pending: bool,
    /// First byte received from the sensor
    pub link_ready: bool,
    pub frames_completed: u64,
    /// Frames completed while grounded
    pub frames_dropped: u64,
    pub noise_dropped: u64,
    pub batches_sealed: u64,
}

/// Flight-phase gated telemetry buffer.
#[derive(Debug, Default)]
pub struct TelemetryCapture {
    phase: FlightPhase,
    pose: Pose,
    assembler: FrameAssembler,
    batch: Batch,
    /// Set on Airborne -> Grounded, cleared by the tick that seals the batch
    flush_pending: bool,
    link_ready: bool,
    frames_dropped: u64,
    batches_sealed: u64,
}

impl TelemetryCapture {
    pub fn new() -> Self {
        Self {
            assembler: FrameAssembler::new(),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    pub fn flush_pending(&self) -> bool {
        self.flush_pending
    }

    // ========================================================================
    // Transport events
    // ========================================================================

    /// Apply a flight status update.
    pub fn on_flight_status(&mut self, status: FlightStatus) -> Option<PhaseChange> {
        let Some(to) = self.phase.transition(status) else {
            debug!(status = %status, phase = %self.phase, "Flight status ignored");
            return None;
        };

        let change = PhaseChange {
            from: self.phase,
            to,
        };
        self.phase = to;

        match to {
            FlightPhase::Airborne => {
                info!(status = %status, "🛫 Airborne, collecting sensor frames");
            }
            FlightPhase::Grounded => {
                self.flush_pending = true;
                info!(
                    status = %status,
                    frames = self.batch.len(),
                    "🛬 Landed, batch will be sealed on next tick"
                );
            }
        }

        Some(change)
    }

    /// Replace latitude, longitude and GPS altitude.
    pub fn on_position(&mut self, latitude: f64, longitude: f64, altitude_gps: f64) {
        self.pose.latitude = latitude;
        self.pose.longitude = longitude;
        self.pose.altitude_gps = altitude_gps;
    }

    /// Replace the height above the takeoff point.
    pub fn on_relative_altitude(&mut self, altitude: f64) {
        self.pose.altitude_relative = altitude;
    }

    // ========================================================================
    // Sensor bytes
    // ========================================================================

    /// Feed one sensor byte, stamping completed frames with the current time.
    pub fn on_byte(&mut self, byte: u8) -> Option<TelemetryFrame> {
        self.on_byte_at(byte, Local::now())
    }

    /// Feed one sensor byte with an explicit capture time.
    ///
    /// A completed frame is appended to the batch only while airborne but is
    /// returned either way.
    pub fn on_byte_at(&mut self, byte: u8, now: DateTime<Local>) -> Option<TelemetryFrame> {
        if !self.link_ready {
            self.link_ready = true;
            info!("📡 Sensor link ready, first byte received");
        }

        let FrameStep::Complete(payload) = self.assembler.push(byte) else {
            return None;
        };

        let frame = TelemetryFrame::new(payload, self.pose, now);
        if self.phase == FlightPhase::Airborne {
            self.batch.push(frame.clone());
            debug!(batch_len = self.batch.len(), "Frame collected");
        } else {
            self.frames_dropped += 1;
            debug!(payload_len = frame.payload.len(), "Frame dropped while grounded");
        }
        Some(frame)
    }

    /// Feed a chunk of sensor bytes; returns the frames completed.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Vec<TelemetryFrame> {
        let now = Local::now();
        bytes.iter().filter_map(|&b| self.on_byte_at(b, now)).collect()
    }

    // ========================================================================
    // Flush policy
    // ========================================================================

    /// Evaluate the flush policy.
    ///
    /// The pending flag, not the current phase, decides the flush, so a
    /// re-takeoff before the tick still seals the landed batch exactly once.
    pub fn on_tick(&mut self) -> TickOutcome {
        if self.flush_pending {
            self.flush_pending = false;
            self.batches_sealed += 1;
            let batch = std::mem::take(&mut self.batch);
            info!(frames = batch.len(), "Batch sealed");
            return TickOutcome::Flush(batch);
        }

        if self.phase == FlightPhase::Grounded && !self.batch.is_empty() {
            let n = self.batch.len();
            self.batch = Batch::new();
            warn!(frames = n, "Discarding frames held while grounded");
            return TickOutcome::Discarded(n);
        }

        TickOutcome::Idle
    }

    pub fn status(&self) -> CaptureStatus {
        CaptureStatus {
            phase: self.phase,
            pose: self.pose,
            batch_len: self.batch.len(),
            flush_pending: self.flush_pending,
            link_ready: self.link_ready,
            frames_completed: self.assembler.frames_completed(),
            frames_dropped: self.frames_dropped,
            noise_dropped: self.assembler.noise_dropped(),
            batches_sealed: self.batches_sealed,
        }
    }
}
