//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse: the raw TOML is first walked as a `toml::Value` tree and
//! compared against the known field names, emitting "did you mean?"
//! warnings. Normal serde deserialization follows. Unknown keys never fail
//! a load.

use std::collections::HashSet;
use std::net::SocketAddr;

use super::defaults::{MAX_POLL_RATE_HZ, STANDARD_BAUD_RATES};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path for `AgentConfig`.
///
/// Maintained by hand against agent_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [capture]
        "capture",
        "capture.device_path",
        "capture.baud_rate",
        "capture.poll_rate_hz",
        "capture.data_dir",
        "capture.listen_addr",
        "capture.upload_retries",
        // [settlement]
        "settlement",
        "settlement.model",
        "settlement.token",
        "settlement.bid_lifetime",
        "settlement.listen_addr",
        "settlement.finish_retries",
        // [endpoints]
        "endpoints",
        "endpoints.chain_rpc",
        "endpoints.content_store",
        "endpoints.liability_finish",
        "endpoints.measurements",
        "endpoints.bids",
        "endpoints.http_timeout_secs",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collects all dotted key paths of a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, if any.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every unknown key in a raw TOML document.
///
/// Syntax errors yield no warnings here; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Range checks on a parsed `AgentConfig`.
///
/// Returns (errors, warnings). Errors must prevent startup.
pub fn validate_ranges(config: &super::AgentConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let c = &config.capture;
    if c.baud_rate == 0 {
        errors.push("capture.baud_rate must be > 0".to_string());
    } else if !STANDARD_BAUD_RATES.contains(&c.baud_rate) {
        warnings.push(ValidationWarning {
            field: "capture.baud_rate".to_string(),
            message: format!("capture.baud_rate = {} is not a standard UART rate", c.baud_rate),
            suggestion: None,
        });
    }
    if !c.poll_rate_hz.is_finite() || c.poll_rate_hz <= 0.0 || c.poll_rate_hz > MAX_POLL_RATE_HZ {
        errors.push(format!(
            "capture.poll_rate_hz = {} must be in (0, {MAX_POLL_RATE_HZ}]",
            c.poll_rate_hz
        ));
    }
    if c.device_path.as_os_str().is_empty() {
        errors.push("capture.device_path must not be empty".to_string());
    }
    if c.data_dir.as_os_str().is_empty() {
        errors.push("capture.data_dir must not be empty".to_string());
    }
    check_listen_addr("capture.listen_addr", &c.listen_addr, &mut errors);

    let s = &config.settlement;
    if s.bid_lifetime == 0 {
        errors.push("settlement.bid_lifetime must be > 0".to_string());
    }
    check_listen_addr("settlement.listen_addr", &s.listen_addr, &mut errors);

    let e = &config.endpoints;
    for (field, url) in [
        ("endpoints.chain_rpc", &e.chain_rpc),
        ("endpoints.content_store", &e.content_store),
        ("endpoints.liability_finish", &e.liability_finish),
        ("endpoints.measurements", &e.measurements),
        ("endpoints.bids", &e.bids),
    ] {
        check_http_url(field, url, &mut errors);
    }
    if e.http_timeout_secs == 0 {
        errors.push("endpoints.http_timeout_secs must be > 0".to_string());
    }

    (errors, warnings)
}

fn check_listen_addr(field: &str, addr: &str, errors: &mut Vec<String>) {
    if addr.parse::<SocketAddr>().is_err() {
        errors.push(format!("{field} = '{addr}' is not a socket address (HOST:PORT)"));
    }
}

fn check_http_url(field: &str, url: &str, errors: &mut Vec<String>) {
    match reqwest::Url::parse(url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        Ok(u) => errors.push(format!("{field}: unsupported scheme '{}'", u.scheme())),
        Err(e) => errors.push(format!("{field} = '{url}' is not a valid URL: {e}")),
    }
}

// ============================================================================
// Tests
// ============================================================================
