//! Event ingress handlers
//!
//! Each POST handler decodes a JSON body and queues the matching event on
//! the agent's actor channel:
//! - 202 Accepted once the event is queued
//! - 422 for a body that does not decode (axum's JSON rejection)
//! - 503 when the actor loop has stopped

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::capture::{CaptureEvent, CaptureHandle, CaptureStatus};
use crate::settlement::{SettlementEvent, SettlementHandle, SettlementSlot};
use crate::types::{AuctionAsk, ContentAnnouncement, FlightStatus};
use crate::AgentStopped;

// ============================================================================
// API State
// ============================================================================

/// Shared state for the capture agent's routes
#[derive(Clone)]
pub struct CaptureApiState {
    pub handle: CaptureHandle,
}

/// Shared state for the settlement agent's routes
#[derive(Clone)]
pub struct SettlementApiState {
    pub handle: SettlementHandle,
    pub slot: Arc<SettlementSlot>,
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FlightStatusRequest {
    pub status: u8,
}

#[derive(Debug, Deserialize)]
pub struct GpsPositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct HeightRequest {
    pub altitude: f64,
}

#[derive(Debug, Serialize)]
pub struct CaptureHealth {
    pub agent: &'static str,
    pub running: bool,
    #[serde(flatten)]
    pub status: CaptureStatus,
}

#[derive(Debug, Serialize)]
pub struct SettlementHealth {
    pub agent: &'static str,
    pub running: bool,
    pub settlement_pending: bool,
}

impl IntoResponse for AgentStopped {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
    }
}

// ============================================================================
// Capture Handlers
// ============================================================================

/// POST /events/flight-status
pub async fn post_flight_status(
    State(state): State<CaptureApiState>,
    Json(req): Json<FlightStatusRequest>,
) -> Result<StatusCode, AgentStopped> {
    debug!(status = req.status, "Flight status received");
    state
        .handle
        .send(CaptureEvent::FlightStatus(FlightStatus(req.status)))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /events/gps-position
pub async fn post_gps_position(
    State(state): State<CaptureApiState>,
    Json(req): Json<GpsPositionRequest>,
) -> Result<StatusCode, AgentStopped> {
    state
        .handle
        .send(CaptureEvent::GpsPosition {
            latitude: req.latitude,
            longitude: req.longitude,
            altitude: req.altitude,
        })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /events/height-above-takeoff
pub async fn post_height_above_takeoff(
    State(state): State<CaptureApiState>,
    Json(req): Json<HeightRequest>,
) -> Result<StatusCode, AgentStopped> {
    state
        .handle
        .send(CaptureEvent::RelativeAltitude(req.altitude))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /health
pub async fn get_capture_health(State(state): State<CaptureApiState>) -> Json<CaptureHealth> {
    Json(CaptureHealth {
        agent: "capture",
        running: state.handle.is_running(),
        status: state.handle.status(),
    })
}

// ============================================================================
// Settlement Handlers
// ============================================================================

/// POST /events/ask
pub async fn post_ask(
    State(state): State<SettlementApiState>,
    Json(ask): Json<AuctionAsk>,
) -> Result<StatusCode, AgentStopped> {
    debug!(model = %ask.model, objective = %ask.objective, "Ask received");
    state.handle.send(SettlementEvent::Ask(ask)).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /events/measurements
pub async fn post_measurements(
    State(state): State<SettlementApiState>,
    Json(msg): Json<ContentAnnouncement>,
) -> Result<StatusCode, AgentStopped> {
    state
        .handle
        .send(SettlementEvent::ContentAnnounced(msg.content_id))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /health
pub async fn get_settlement_health(
    State(state): State<SettlementApiState>,
) -> Json<SettlementHealth> {
    Json(SettlementHealth {
        agent: "settlement",
        running: state.handle.is_running(),
        settlement_pending: state.slot.is_ready(),
    })
}
