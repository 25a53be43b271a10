//! Telemetry types: Pose, TelemetryFrame, FlightStatus, FlightPhase, Batch

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Timestamp format embedded in every frame record.
pub const FRAME_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// ============================================================================
// Vehicle Pose
// ============================================================================

/// Latest known vehicle position, sampled when a frame completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Latitude (degrees)
    pub latitude: f64,
    /// Longitude (degrees)
    pub longitude: f64,
    /// GPS altitude (m)
    pub altitude_gps: f64,
    /// Height above takeoff point (m)
    pub altitude_relative: f64,
}

// ============================================================================
// Telemetry Frame
// ============================================================================

/// One decoded sensor frame stamped with the pose at decode time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryFrame {
    /// Characters received before the terminator
    pub payload: String,
    pub pose: Pose,
    pub captured_at: DateTime<Local>,
}

impl TelemetryFrame {
    pub fn new(payload: String, pose: Pose, captured_at: DateTime<Local>) -> Self {
        Self {
            payload,
            pose,
            captured_at,
        }
    }

    /// Render the multi-line text record written to the batch file.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.payload.len() + 192);
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        // Writing into a String cannot fail
        let _ = write!(
            out,
            "{}\n\
             Copter Latitude: {:.6}\n\
             Copter Longitude: {:.6}\n\
             Copter GPS Altitude: {:.2} m\n\
             Copter Relative Altitude: {:.2} m\n\
             System time: {}\n",
            self.payload,
            self.pose.latitude,
            self.pose.longitude,
            self.pose.altitude_gps,
            self.pose.altitude_relative,
            self.captured_at.format(FRAME_TIME_FORMAT),
        );
    }
}

// ============================================================================
// Flight Status / Phase
// ============================================================================

/// Raw flight status code as published by the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightStatus(pub u8);

impl FlightStatus {
    pub const ON_GROUND: Self = Self(1);
    pub const IN_AIR_STANDBY: Self = Self(3);
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::ON_GROUND => write!(f, "on-ground(1)"),
            Self::IN_AIR_STANDBY => write!(f, "in-air-standby(3)"),
            Self(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Whether frames are currently being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum FlightPhase {
    #[default]
    Grounded,
    Airborne,
}

impl FlightPhase {
    /// Apply a flight status to the current phase.
    ///
    /// Returns `None` when the status leaves the phase unchanged, including
    /// repeats and unrecognised codes.
    pub fn transition(self, status: FlightStatus) -> Option<Self> {
        match (self, status) {
            (Self::Grounded, FlightStatus::IN_AIR_STANDBY) => Some(Self::Airborne),
            (Self::Airborne, FlightStatus::ON_GROUND) => Some(Self::Grounded),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightPhase::Grounded => write!(f, "Grounded"),
            FlightPhase::Airborne => write!(f, "Airborne"),
        }
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Frames collected during one airborne period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    frames: Vec<TelemetryFrame>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: TelemetryFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[TelemetryFrame] {
        &self.frames
    }

    /// Concatenated frame records, in arrival order.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.frames.len() * 200);
        for frame in &self.frames {
            frame.render_into(&mut out);
        }
        out
    }
}
