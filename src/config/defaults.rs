//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Capture
// ============================================================================

/// Sensor board serial device.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyUSB0";

/// Sensor board line speed (8N1).
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Flush-policy evaluation rate (Hz).
pub const DEFAULT_POLL_RATE_HZ: f64 = 1.0;

/// Upper bound on the flush-policy evaluation rate (Hz).
pub const MAX_POLL_RATE_HZ: f64 = 100.0;

/// Directory receiving one text file per flushed batch.
pub const DEFAULT_DATA_DIR: &str = "./sensor_data";

/// Capture agent event ingress.
pub const DEFAULT_CAPTURE_LISTEN_ADDR: &str = "0.0.0.0:8601";

/// Baud rates a UART is normally configured with.
pub const STANDARD_BAUD_RATES: &[u32] = &[
    1_200, 2_400, 4_800, 9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

// ============================================================================
// Settlement
// ============================================================================

/// Bid validity, in blocks past the current height.
pub const DEFAULT_BID_LIFETIME: u64 = 100;

/// Settlement agent event ingress.
pub const DEFAULT_SETTLEMENT_LISTEN_ADDR: &str = "0.0.0.0:8602";

// ============================================================================
// Endpoints
// ============================================================================

pub const DEFAULT_CHAIN_RPC: &str = "http://127.0.0.1:8545";

pub const DEFAULT_CONTENT_STORE: &str = "http://127.0.0.1:5001";

pub const DEFAULT_LIABILITY_FINISH: &str = "http://127.0.0.1:8603/liability/finish";

pub const DEFAULT_MEASUREMENTS_URL: &str = "http://127.0.0.1:8602/events/measurements";

pub const DEFAULT_BIDS_URL: &str = "http://127.0.0.1:8604/bids";

/// HTTP client timeout for all outbound calls (seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Agent Loops
// ============================================================================

/// Capacity of each agent's event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Maximum accepted ingress body size (bytes).
pub const MAX_EVENT_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// Retry Backoff
// ============================================================================

/// First retry delay when retries are enabled (ms).
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;

/// Retry delay cap (ms).
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;
