//! Dashboard pipeline: reading series → display snapshot.
//!
//! ```text
//!   ReadingSource ──▶ CachedSource ──▶ Snapshot::build ──▶ render sink
//!   (HTTP / file)      (TTL cache)      (pure)              (CLI / web)
//! ```
//!
//! [`Snapshot::build`] is pure: given the same series, clock and settings it
//! returns the same snapshot. [`run_cycle`] is the one-shot pipeline that an
//! external scheduler (the `watch` loop, or the browser's refresh timer)
//! invokes; it carries no state between calls apart from the fetch cache.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::config::TankwatchConfig;
use crate::estimator::{TimingEstimator, TimingResult, TimingView};
use crate::feed::{CachedSource, ReadingSource};
use crate::logging::polls::{self, PollLogEntry};
use crate::readings::{Reading, ReadingSeries};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The subset of configuration the snapshot builder needs.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub critical_at: f64,
    pub warning_at: f64,
    pub history_len: usize,
    pub tolerance: f64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from_config(&TankwatchConfig::default())
    }
}

impl DashboardSettings {
    pub fn from_config(config: &TankwatchConfig) -> Self {
        Self {
            critical_at: config.alerts.critical_at,
            warning_at: config.alerts.warning_at,
            history_len: config.dashboard.history_len,
            tolerance: config.estimator.tolerance,
        }
    }

    pub fn estimator(&self) -> TimingEstimator {
        TimingEstimator::new(self.tolerance)
    }
}

// ---------------------------------------------------------------------------
// Alert level
// ---------------------------------------------------------------------------

/// Banner classification of the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Warning,
    Ok,
}

impl AlertLevel {
    pub fn classify(level: f64, settings: &DashboardSettings) -> Self {
        if level <= settings.critical_at {
            Self::Critical
        } else if level <= settings.warning_at {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    /// Banner text for a given level.
    pub fn message(&self, level: f64) -> String {
        match self {
            Self::Critical => format!("Critical level! Only {level}% of water left."),
            Self::Warning => format!("Low level detected ({level}%)."),
            Self::Ok => format!("All good. Water level is adequate ({level}%)."),
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Ok => write!(f, "ok"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

/// Direction of the last change between the two newest readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum Trend {
    Filling { delta: f64 },
    Draining { delta: f64 },
    Stable,
    Unknown,
}

impl Trend {
    pub fn from_series(series: &ReadingSeries) -> Self {
        let (Some(latest), Some(previous)) = (series.latest(), series.previous()) else {
            return Self::Unknown;
        };

        let diff = latest.level - previous.level;
        if diff > 0.0 {
            Self::Filling { delta: diff }
        } else if diff < 0.0 {
            Self::Draining { delta: -diff }
        } else {
            Self::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Filling { .. } => "Filling",
            Self::Draining { .. } => "Draining",
            Self::Stable => "Stable",
            Self::Unknown => "--",
        }
    }

    /// Signed change as `"↑ 4.0%"` / `"↓ 4.0%"`, if any.
    pub fn delta_text(&self) -> Option<String> {
        match self {
            Self::Filling { delta } => Some(format!("↑ {delta:.1}%")),
            Self::Draining { delta } => Some(format!("↓ {delta:.1}%")),
            Self::Stable | Self::Unknown => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the dashboard shows for one refresh.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub current_level: f64,
    pub alert: AlertLevel,
    pub trend: Trend,
    pub timing: TimingResult,
    pub last_update: DateTime<FixedOffset>,
    pub minutes_since_update: i64,
    pub history: Vec<Reading>,
    pub warnings: Vec<String>,
    pub reading_count: usize,
}

impl Snapshot {
    /// Build a snapshot. Returns `None` for an empty series.
    pub fn build(
        series: &ReadingSeries,
        now: DateTime<Utc>,
        settings: &DashboardSettings,
    ) -> Option<Self> {
        let latest = series.latest()?;
        let minutes_since_update = (now - latest.timestamp.with_timezone(&Utc)).num_minutes();

        Some(Self {
            current_level: latest.level,
            alert: AlertLevel::classify(latest.level, settings),
            trend: Trend::from_series(series),
            timing: settings.estimator().estimate(series.as_slice()),
            last_update: latest.timestamp,
            minutes_since_update,
            history: series.recent(settings.history_len).to_vec(),
            warnings: series.warnings().iter().map(ToString::to_string).collect(),
            reading_count: series.len(),
        })
    }

    /// `"just now"` under a minute, otherwise `"{N} min ago"`.
    pub fn update_text(&self) -> String {
        if self.minutes_since_update < 1 {
            "just now".to_string()
        } else {
            format!("{} min ago", self.minutes_since_update)
        }
    }

    /// JSON shape served by the web API and `status --format json`.
    pub fn view(&self) -> SnapshotView {
        SnapshotView {
            current_level: self.current_level,
            alert: self.alert,
            alert_message: self.alert.message(self.current_level),
            trend: self.trend,
            trend_label: self.trend.label().to_string(),
            trend_delta: self.trend.delta_text(),
            timing: self.timing.view(),
            last_update: self.last_update,
            minutes_since_update: self.minutes_since_update,
            update_text: self.update_text(),
            history: self.history.clone(),
            warnings: self.warnings.clone(),
            reading_count: self.reading_count,
        }
    }
}

/// Serializable form of a [`Snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub current_level: f64,
    pub alert: AlertLevel,
    pub alert_message: String,
    pub trend: Trend,
    pub trend_label: String,
    pub trend_delta: Option<String>,
    pub timing: TimingView,
    pub last_update: DateTime<FixedOffset>,
    pub minutes_since_update: i64,
    pub update_text: String,
    pub history: Vec<Reading>,
    pub warnings: Vec<String>,
    pub reading_count: usize,
}

// ---------------------------------------------------------------------------
// Pipeline cycle
// ---------------------------------------------------------------------------

/// Result of one fetch → estimate → snapshot cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Ready(Box<Snapshot>),
    /// The feed answered without readings.
    NoData,
    /// Fetching or decoding failed; the next cycle starts fresh.
    Failed(String),
}

/// Run one pipeline cycle through the cache and record it in the poll log.
pub fn run_cycle<S: ReadingSource>(
    source: &mut CachedSource<S>,
    settings: &DashboardSettings,
    now: DateTime<Utc>,
    log: bool,
) -> CycleOutcome {
    let outcome = match source.get() {
        Ok(Some(series)) => match Snapshot::build(&series, now, settings) {
            Some(snapshot) => CycleOutcome::Ready(Box::new(snapshot)),
            None => CycleOutcome::NoData,
        },
        Ok(None) => CycleOutcome::NoData,
        Err(e) => CycleOutcome::Failed(format!("{e:#}")),
    };

    if log {
        polls::record(&poll_entry(&source.source().describe(), &outcome));
    }

    outcome
}

fn poll_entry(source: &str, outcome: &CycleOutcome) -> PollLogEntry {
    match outcome {
        CycleOutcome::Ready(snapshot) => {
            let mut entry = PollLogEntry::now(source, true);
            entry.readings = snapshot.reading_count;
            entry.current_level = Some(snapshot.current_level);
            entry.fill_minutes = snapshot.timing.fill_minutes();
            entry.empty_minutes = snapshot.timing.empty_minutes();
            entry
        }
        CycleOutcome::NoData => PollLogEntry::now(source, true),
        CycleOutcome::Failed(error) => {
            let mut entry = PollLogEntry::now(source, false);
            entry.error = Some(error.clone());
            entry
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
