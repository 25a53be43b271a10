//! Agent Configuration - capture, settlement and endpoint settings as TOML
//!
//! Each struct implements `Default` so a missing file or section falls back
//! to the values in `defaults.rs`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults::*;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "AIRSENSE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "airsense.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration shared by both agents.
///
/// Load with `AgentConfig::load()` which searches:
/// 1. explicit path (`--config`)
/// 2. `$AIRSENSE_CONFIG`
/// 3. `./airsense.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Sensor capture agent
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Auction and settlement agent
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// External collaborators
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

/// Sensor capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Serial device carrying the sensor stream
    pub device_path: PathBuf,
    /// Line speed the device is configured for
    pub baud_rate: u32,
    /// Flush-policy evaluation rate (Hz)
    pub poll_rate_hz: f64,
    /// Directory for flushed batch files
    pub data_dir: PathBuf,
    /// Event ingress bind address
    pub listen_addr: String,
    /// Extra upload attempts after a failure (0 = drop the batch)
    pub upload_retries: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_rate_hz: DEFAULT_POLL_RATE_HZ,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            listen_addr: DEFAULT_CAPTURE_LISTEN_ADDR.to_string(),
            upload_retries: 0,
        }
    }
}

impl CaptureConfig {
    /// Tick period derived from `poll_rate_hz`.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.poll_rate_hz)
    }
}

/// Auction and settlement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Model identifier asks must match
    pub model: String,
    /// Token identifier asks must match
    pub token: String,
    /// Bid validity in blocks
    pub bid_lifetime: u64,
    /// Event ingress bind address
    pub listen_addr: String,
    /// Extra finish-liability attempts after a failure (0 = skip)
    pub finish_retries: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            token: String::new(),
            bid_lifetime: DEFAULT_BID_LIFETIME,
            listen_addr: DEFAULT_SETTLEMENT_LISTEN_ADDR.to_string(),
            finish_retries: 0,
        }
    }
}

/// External collaborator endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Ethereum JSON-RPC node
    pub chain_rpc: String,
    /// IPFS RPC API base URL
    pub content_store: String,
    /// Liability finish action
    pub liability_finish: String,
    /// Subscriber for content announcements
    pub measurements: String,
    /// Subscriber for bids
    pub bids: String,
    /// Timeout applied to every outbound HTTP call
    pub http_timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            chain_rpc: DEFAULT_CHAIN_RPC.to_string(),
            content_store: DEFAULT_CONTENT_STORE.to_string(),
            liability_finish: DEFAULT_LIABILITY_FINISH.to_string(),
            measurements: DEFAULT_MEASUREMENTS_URL.to_string(),
            bids: DEFAULT_BIDS_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl AgentConfig {
    /// Load configuration using the standard search order.
    ///
    /// An explicit path must load; a bad `$AIRSENSE_CONFIG` or local file
    /// only warns and falls back.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. Explicit path
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded agent config");
            return Ok(config);
        }

        // 2. Env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded agent config from {}", CONFIG_ENV_VAR);
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 3. ./airsense.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded agent config from ./{}", LOCAL_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 4. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings for internal consistency.
    ///
    /// Suspicious values are logged as warnings; impossible ones fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in warnings {
            warn!(field = %w.field, "{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Checks only the settlement agent needs at startup.
    pub fn validate_for_settlement(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.settlement.model.trim().is_empty() {
            errors.push("settlement.model must be set".to_string());
        }
        if self.settlement.token.trim().is_empty() {
            errors.push("settlement.token must be set".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}
