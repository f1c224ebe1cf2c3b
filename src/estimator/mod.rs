//! Fill/empty time estimation from a reading series.
//!
//! The estimator looks for the most recent reading near the series minimum
//! (the trough) and the most recent reading near the series maximum (the
//! peak), each within a tolerance band of [`DEFAULT_TOLERANCE`] percentage
//! points. Whichever of the two came last decides the direction:
//!
//! ```text
//!   trough ... peak   → fill  = t(peak)   - t(trough)
//!   peak ... trough   → empty = t(trough) - t(peak)
//! ```
//!
//! At most one of the two estimates is produced per call.

use chrono::Duration;
use serde::Serialize;

use crate::readings::Reading;

/// Width of the band (in percentage points) around the min/max within which
/// a reading counts as "at" the extreme.
pub const DEFAULT_TOLERANCE: f64 = 5.0;

/// Placeholder shown when an estimate cannot be derived.
pub const UNDETERMINED: &str = "--";

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Fill and empty duration estimates. `None` means undetermined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingResult {
    pub fill: Option<Duration>,
    pub empty: Option<Duration>,
}

impl TimingResult {
    pub fn undetermined() -> Self {
        Self::default()
    }

    pub fn fill_minutes(&self) -> Option<i64> {
        self.fill.map(|d| d.num_minutes())
    }

    pub fn empty_minutes(&self) -> Option<i64> {
        self.empty.map(|d| d.num_minutes())
    }

    /// Time to fill as display text, or `"--"`.
    pub fn fill_text(&self) -> String {
        duration_text(self.fill)
    }

    /// Time to empty as display text, or `"--"`.
    pub fn empty_text(&self) -> String {
        duration_text(self.empty)
    }

    /// Serializable view for JSON output.
    pub fn view(&self) -> TimingView {
        TimingView {
            fill_minutes: self.fill_minutes(),
            empty_minutes: self.empty_minutes(),
            fill_text: self.fill_text(),
            empty_text: self.empty_text(),
        }
    }
}

/// JSON shape of a [`TimingResult`].
#[derive(Debug, Clone, Serialize)]
pub struct TimingView {
    pub fill_minutes: Option<i64>,
    pub empty_minutes: Option<i64>,
    pub fill_text: String,
    pub empty_text: String,
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Derives [`TimingResult`]s from reading series. Stateless and pure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingEstimator {
    tolerance: f64,
}

impl Default for TimingEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl TimingEstimator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Estimate fill or empty time for a series ordered oldest to newest.
    pub fn estimate(&self, readings: &[Reading]) -> TimingResult {
        if readings.len() < 2 {
            return TimingResult::undetermined();
        }

        let (min_level, max_level) = readings.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), r| (lo.min(r.level), hi.max(r.level)),
        );

        let (Some(trough), Some(peak)) = self.last_extremes(readings, min_level, max_level)
        else {
            return TimingResult::undetermined();
        };

        let mut result = TimingResult::undetermined();
        if peak > trough {
            result.fill = Some(elapsed(&readings[trough], &readings[peak]));
        } else if trough > peak {
            result.empty = Some(elapsed(&readings[peak], &readings[trough]));
        }
        result
    }

    /// Scan newest to oldest for the most recent near-min and near-max
    /// indices, stopping once both are known.
    fn last_extremes(
        &self,
        readings: &[Reading],
        min_level: f64,
        max_level: f64,
    ) -> (Option<usize>, Option<usize>) {
        let mut trough = None;
        let mut peak = None;

        for (i, reading) in readings.iter().enumerate().rev() {
            if trough.is_none() && reading.level <= min_level + self.tolerance {
                trough = Some(i);
            }
            if peak.is_none() && reading.level >= max_level - self.tolerance {
                peak = Some(i);
            }
            if trough.is_some() && peak.is_some() {
                break;
            }
        }

        (trough, peak)
    }
}

/// Wall-clock time from `from` to `to`, never negative.
fn elapsed(from: &Reading, to: &Reading) -> Duration {
    let delta = to.timestamp - from.timestamp;
    if delta < Duration::zero() { -delta } else { delta }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn duration_text(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format_minutes(d.num_minutes()),
        None => UNDETERMINED.to_string(),
    }
}

/// Render a whole number of minutes as `"45 min"`, `"1h 15min"`, `"2h"`,
/// `"1d 9h"` or `"3d"`. Components are truncated, not rounded.
pub fn format_minutes(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes} min")
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let mins = minutes % 60;
        if mins > 0 {
            format!("{hours}h {mins}min")
        } else {
            format!("{hours}h")
        }
    } else {
        let days = minutes / 1440;
        let hours = (minutes % 1440) / 60;
        if hours > 0 {
            format!("{days}d {hours}h")
        } else {
            format!("{days}d")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
