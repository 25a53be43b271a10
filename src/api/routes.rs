//! API route definitions
//!
//! Capture agent:
//! - POST /events/flight-status
//! - POST /events/gps-position
//! - POST /events/height-above-takeoff
//! - GET  /health
//!
//! Settlement agent:
//! - POST /events/ask
//! - POST /events/measurements
//! - GET  /health

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, CaptureApiState, SettlementApiState};

/// Routes served by `airsense capture`
pub fn capture_routes(state: CaptureApiState) -> Router {
    Router::new()
        .route("/events/flight-status", post(handlers::post_flight_status))
        .route("/events/gps-position", post(handlers::post_gps_position))
        .route(
            "/events/height-above-takeoff",
            post(handlers::post_height_above_takeoff),
        )
        .route("/health", get(handlers::get_capture_health))
        .with_state(state)
}

/// Routes served by `airsense settle`
pub fn settlement_routes(state: SettlementApiState) -> Router {
    Router::new()
        .route("/events/ask", post(handlers::post_ask))
        .route("/events/measurements", post(handlers::post_measurements))
        .route("/health", get(handlers::get_settlement_health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureEvent, CaptureHandle, CaptureStatus};
    use crate::settlement::{SettlementEvent, SettlementHandle, SettlementSlot};
    use crate::types::{AuctionAsk, ContentId, FlightPhase, FlightStatus};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_flight_status_queued() {
        let (handle, mut rx, _status) = CaptureHandle::detached();
        let app = capture_routes(CaptureApiState { handle });

        let response = app
            .oneshot(post_json("/events/flight-status", r#"{"status":3}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.recv().await,
            Some(CaptureEvent::FlightStatus(FlightStatus::IN_AIR_STANDBY))
        );
    }

    #[tokio::test]
    async fn test_position_events_queued() {
        let (handle, mut rx, _status) = CaptureHandle::detached();
        let app = capture_routes(CaptureApiState { handle });

        let response = app
            .clone()
            .oneshot(post_json(
                "/events/gps-position",
                r#"{"latitude":12.0,"longitude":34.0,"altitude":56.0}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .oneshot(post_json("/events/height-above-takeoff", r#"{"altitude":7.0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        assert_eq!(
            rx.recv().await,
            Some(CaptureEvent::GpsPosition {
                latitude: 12.0,
                longitude: 34.0,
                altitude: 56.0
            })
        );
        assert_eq!(rx.recv().await, Some(CaptureEvent::RelativeAltitude(7.0)));
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let (handle, mut rx, _status) = CaptureHandle::detached();
        let app = capture_routes(CaptureApiState { handle });

        let response = app
            .oneshot(post_json("/events/flight-status", r#"{"status":"airborne"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stopped_agent_is_unavailable() {
        let (handle, rx, _status) = CaptureHandle::detached();
        drop(rx);
        let app = capture_routes(CaptureApiState { handle });

        let response = app
            .oneshot(post_json("/events/flight-status", r#"{"status":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_capture_health_reports_status() {
        let (handle, _rx, status_tx) = CaptureHandle::detached();
        status_tx.send_replace(CaptureStatus {
            phase: FlightPhase::Airborne,
            batch_len: 4,
            ..CaptureStatus::default()
        });
        let app = capture_routes(CaptureApiState { handle });

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["agent"], "capture");
        assert_eq!(json["running"], true);
        assert_eq!(json["phase"], "Airborne");
        assert_eq!(json["batch_len"], 4);
    }

    #[tokio::test]
    async fn test_ask_and_measurements_queued() {
        let (handle, mut rx) = SettlementHandle::detached();
        let app = settlement_routes(SettlementApiState {
            handle,
            slot: Arc::new(SettlementSlot::new()),
        });

        let response = app
            .clone()
            .oneshot(post_json(
                "/events/ask",
                r#"{"model":"m1","token":"t1","objective":"o","cost":5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .oneshot(post_json("/events/measurements", r#"{"content_id":"QmHash"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        assert_eq!(
            rx.recv().await,
            Some(SettlementEvent::Ask(AuctionAsk {
                model: "m1".into(),
                token: "t1".into(),
                objective: "o".into(),
                cost: 5,
            }))
        );
        assert_eq!(
            rx.recv().await,
            Some(SettlementEvent::ContentAnnounced(ContentId::new("QmHash")))
        );
    }

    #[tokio::test]
    async fn test_settlement_health_shows_pending() {
        let (handle, _rx) = SettlementHandle::detached();
        let slot = Arc::new(SettlementSlot::new());
        slot.mark_ready(ContentId::new("Qm1"));
        let app = settlement_routes(SettlementApiState { handle, slot });

        let json = body_json(app.oneshot(get("/health")).await.unwrap()).await;
        assert_eq!(json["agent"], "settlement");
        assert_eq!(json["settlement_pending"], true);
    }
}
