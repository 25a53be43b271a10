//! Capture Actor - serializes transport events, sensor bytes and ticks
//!
//! One loop owns the `TelemetryCapture` state, so phase, pose and batch are
//! never shared. Flushes run inline: while a flush is in flight no other
//! event is handled.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::flush::{BatchFlusher, FlushReport};
use super::state::{CaptureStatus, TelemetryCapture, TickOutcome};
use crate::acquisition::{ByteEvent, ByteSource};
use crate::config::defaults::EVENT_CHANNEL_CAPACITY;
use crate::types::FlightStatus;
use crate::AgentStopped;

// ============================================================================
// Events
// ============================================================================

/// Transport events consumed by the capture agent.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    FlightStatus(FlightStatus),
    GpsPosition {
        latitude: f64,
        longitude: f64,
        altitude: f64,
    },
    RelativeAltitude(f64),
}

// ============================================================================
// Actor Handle
// ============================================================================

/// Handle used by the ingress to feed the capture loop.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<CaptureEvent>,
    status: watch::Receiver<CaptureStatus>,
}

impl CaptureHandle {
    /// Queue an event, waiting for channel capacity.
    pub async fn send(&self, event: CaptureEvent) -> Result<(), AgentStopped> {
        self.tx.send(event).await.map_err(|_| AgentStopped)
    }

    /// Latest published status snapshot.
    pub fn status(&self) -> CaptureStatus {
        self.status.borrow().clone()
    }

    /// Whether the capture loop is still running.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Handle wired to bare channel ends instead of an actor.
    #[cfg(test)]
    pub(crate) fn detached() -> (
        Self,
        mpsc::Receiver<CaptureEvent>,
        watch::Sender<CaptureStatus>,
    ) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status) = watch::channel(CaptureStatus::default());
        (Self { tx, status }, rx, status_tx)
    }
}

// ============================================================================
// Capture Actor
// ============================================================================

/// Final counters returned when the loop exits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSummary {
    pub status: CaptureStatus,
    pub flushes: Vec<FlushReport>,
    pub bytes_read: u64,
}

enum Wake {
    Event(CaptureEvent),
    Bytes(Vec<u8>),
    SourceDone,
    Tick,
}

pub struct CaptureActor<S: ByteSource> {
    state: TelemetryCapture,
    flusher: BatchFlusher,
    source: S,
    rx: mpsc::Receiver<CaptureEvent>,
    status_tx: watch::Sender<CaptureStatus>,
    tick_interval: Duration,
    cancel: CancellationToken,
}

impl<S: ByteSource> CaptureActor<S> {
    /// Create the actor and its handle.
    pub fn new(
        source: S,
        flusher: BatchFlusher,
        tick_interval: Duration,
        cancel: CancellationToken,
    ) -> (Self, CaptureHandle) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let state = TelemetryCapture::new();
        let (status_tx, status) = watch::channel(state.status());

        let actor = Self {
            state,
            flusher,
            source,
            rx,
            status_tx,
            tick_interval,
            cancel,
        };

        (actor, CaptureHandle { tx, status })
    }

    /// Run until cancelled or every handle is dropped.
    ///
    /// Source EOF stops byte reading only; events and ticks continue.
    pub async fn run(mut self) -> CaptureSummary {
        info!(
            source = self.source.source_name(),
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            "[Capture] Starting"
        );

        let start = tokio::time::Instant::now() + self.tick_interval;
        let mut ticker = tokio::time::interval_at(start, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut source_open = true;
        let mut bytes_read = 0u64;
        let mut flushes = Vec::new();

        loop {
            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("[Capture] Shutdown signal received");
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(ev) => Wake::Event(ev),
                    None => {
                        info!("[Capture] Event channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => Wake::Tick,
                result = self.source.next_chunk(), if source_open => match result {
                    Ok(ByteEvent::Bytes(bytes)) => Wake::Bytes(bytes),
                    Ok(ByteEvent::Eof) => Wake::SourceDone,
                    Err(e) => {
                        warn!(error = %e, "[Capture] Source error, sensor reading stopped");
                        Wake::SourceDone
                    }
                },
            };

            match wake {
                Wake::Event(event) => self.handle_event(event),
                Wake::Bytes(bytes) => {
                    bytes_read += bytes.len() as u64;
                    let frames = self.state.on_bytes(&bytes);
                    if !frames.is_empty() {
                        debug!(frames = frames.len(), "[Capture] Frames completed");
                    }
                }
                Wake::SourceDone => {
                    source_open = false;
                    info!(
                        source = self.source.source_name(),
                        bytes_read,
                        "[Capture] Sensor source ended"
                    );
                }
                Wake::Tick => {
                    if let Some(report) = self.tick().await {
                        flushes.push(report);
                    }
                }
            }
        }

        // A landed batch not yet sealed would otherwise be lost
        if self.state.flush_pending() {
            info!("[Capture] Flushing landed batch before exit");
            if let Some(report) = self.tick().await {
                flushes.push(report);
            }
        }

        let status = self.state.status();
        info!(
            frames_completed = status.frames_completed,
            frames_dropped = status.frames_dropped,
            batches_sealed = status.batches_sealed,
            unflushed = status.batch_len,
            "[Capture] Stopped"
        );

        CaptureSummary {
            status,
            flushes,
            bytes_read,
        }
    }

    fn handle_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::FlightStatus(status) => {
                self.state.on_flight_status(status);
            }
            CaptureEvent::GpsPosition {
                latitude,
                longitude,
                altitude,
            } => self.state.on_position(latitude, longitude, altitude),
            CaptureEvent::RelativeAltitude(altitude) => self.state.on_relative_altitude(altitude),
        }
    }

    async fn tick(&mut self) -> Option<FlushReport> {
        let report = match self.state.on_tick() {
            TickOutcome::Flush(batch) => Some(self.flusher.flush(batch).await),
            TickOutcome::Discarded(_) | TickOutcome::Idle => None,
        };
        self.status_tx.send_replace(self.state.status());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ReaderSource;
    use crate::clients::{ClientError, ContentStore, Publisher};
    use crate::storage::BatchFileWriter;
    use crate::types::{Bid, ContentId, FlightPhase};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        puts: Mutex<Vec<Vec<u8>>>,
        announced: Mutex<Vec<ContentId>>,
    }

    #[async_trait]
    impl ContentStore for Recorder {
        async fn put(&self, _name: &str, bytes: Vec<u8>) -> Result<ContentId, ClientError> {
            let mut puts = self.puts.lock().unwrap();
            puts.push(bytes);
            Ok(ContentId::new(format!("Qm{}", puts.len())))
        }
    }

    #[async_trait]
    impl Publisher for Recorder {
        async fn publish_content(&self, content_id: &ContentId) -> Result<(), ClientError> {
            self.announced.lock().unwrap().push(content_id.clone());
            Ok(())
        }

        async fn publish_bid(&self, _bid: &Bid) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handle_reports_initial_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let flusher = BatchFlusher::new(BatchFileWriter::new(dir.path()), recorder.clone(), recorder);
        let source = ReaderSource::new(tokio_test::io::Builder::new().build(), "mock");
        let (_actor, handle) =
            CaptureActor::new(source, flusher, Duration::from_secs(1), CancellationToken::new());

        assert_eq!(handle.status().phase, FlightPhase::Grounded);
        assert!(handle.is_running());
    }

    #[tokio::test]
    async fn test_flush_pending_at_shutdown_is_flushed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let flusher =
            BatchFlusher::new(BatchFileWriter::new(dir.path()), recorder.clone(), recorder.clone());
        let source = ReaderSource::new(tokio::io::empty(), "empty");
        let cancel = CancellationToken::new();
        // Tick far in the future so only the shutdown path can flush
        let (actor, handle) = CaptureActor::new(source, flusher, Duration::from_secs(3600), cancel.clone());
        let task = tokio::spawn(actor.run());

        handle
            .send(CaptureEvent::FlightStatus(FlightStatus::IN_AIR_STANDBY))
            .await
            .unwrap();
        handle
            .send(CaptureEvent::FlightStatus(FlightStatus::ON_GROUND))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let summary = task.await.unwrap();
        assert_eq!(summary.flushes.len(), 1);
        assert_eq!(recorder.announced.lock().unwrap().len(), 1);
        assert!(!summary.status.flush_pending);
    }
}
