//! Configuration schema and defaults for tankwatch.
//!
//! Defines the TOML-serializable configuration structure with the sections
//! `[feed]`, `[estimator]`, `[alerts]`, `[dashboard]`, `[auth]`, and
//! `[logging]`.
//!
//! Every field has a sensible built-in default except `feed.url`, which must
//! be set before polling over HTTP.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::estimator::DEFAULT_TOLERANCE;
use crate::feed::DEFAULT_CACHE_TTL_SECS;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level tankwatch configuration.
///
/// Maps directly to `~/.tankwatch/config.toml` and `.tankwatch.toml`. All
/// sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TankwatchConfig {
    pub feed: FeedConfig,
    pub estimator: EstimatorConfig,
    pub alerts: AlertsConfig,
    pub dashboard: DashboardConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [feed]
// ---------------------------------------------------------------------------

/// Reading feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// URL answering GET with `{ "success": bool, "data": [...] }`.
    pub url: String,
    /// Request timeout (seconds).
    pub timeout_secs: u64,
    /// How long a successful fetch is reused (seconds).
    pub cache_ttl_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 10,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// [estimator]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Percentage points around the min/max that still count as the extreme.
    pub tolerance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

// ---------------------------------------------------------------------------
// [alerts]
// ---------------------------------------------------------------------------

/// Level thresholds for the alert banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// At or below this level the tank is critical.
    pub critical_at: f64,
    /// At or below this level (and above `critical_at`) the tank is low.
    pub warning_at: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            critical_at: 25.0,
            warning_at: 50.0,
        }
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

/// Dashboard server and refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Address the web dashboard binds to.
    pub bind: String,
    /// Seconds between refreshes (`watch` loop and browser polling).
    pub refresh_secs: u64,
    /// Number of recent readings shown in the history chart.
    pub history_len: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            refresh_secs: 300,
            history_len: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// [auth]
// ---------------------------------------------------------------------------

/// Login gate for the web dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a login before the dashboard API answers.
    pub enabled: bool,
    /// Session lifetime (seconds).
    pub session_ttl_secs: u64,
    /// Username → password table.
    pub users: BTreeMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_ttl_secs: 12 * 60 * 60,
            users: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the event log and poll log are written.
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl TankwatchConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `tankwatch config init`.
    pub fn default_toml() -> String {
        r#"# tankwatch Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (TANKWATCH_*)
#   2. Project config (.tankwatch.toml in current directory)
#   3. User global config (~/.tankwatch/config.toml)
#   4. Built-in defaults

[feed]
url = ""                    # Endpoint returning { "success": true, "data": [...] }
timeout_secs = 10
cache_ttl_secs = 300        # Reuse a successful fetch for this long

[estimator]
tolerance = 5.0             # Percentage points around min/max

[alerts]
critical_at = 25.0
warning_at = 50.0

[dashboard]
bind = "127.0.0.1:8501"
refresh_secs = 300
history_len = 10

[auth]
enabled = true              # Set false (or TANKWATCH_AUTH=0) for local use
session_ttl_secs = 43200

[auth.users]
# admin = "change-me"

[logging]
enabled = true              # ~/.tankwatch/tankwatch.log and poll-log.jsonl
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
