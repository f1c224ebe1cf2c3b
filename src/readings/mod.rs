//! Tank level readings and the feed document that carries them.
//!
//! A [`Reading`] is one timestamped level sample. A [`ReadingSeries`] is the
//! full, ordered set of readings returned by one poll of the feed (oldest
//! first). Series are never appended to; every poll produces a fresh one.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A single tank level sample.
///
/// `level` is a percentage and is expected (not enforced) to lie in
/// `[0, 100]`. The timestamp keeps the offset it was reported with;
/// comparisons and subtraction operate on the absolute instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReading")]
pub struct Reading {
    pub level: f64,
    #[serde(rename = "dateTime")]
    pub timestamp: DateTime<FixedOffset>,
}

impl Reading {
    pub fn new(level: f64, timestamp: DateTime<FixedOffset>) -> Self {
        Self { level, timestamp }
    }
}

/// Wire shape of a reading before its timestamp is parsed.
#[derive(Debug, Deserialize)]
struct RawReading {
    level: f64,
    #[serde(rename = "dateTime")]
    date_time: String,
}

impl TryFrom<RawReading> for Reading {
    type Error = anyhow::Error;

    fn try_from(raw: RawReading) -> Result<Self> {
        let timestamp = parse_timestamp(&raw.date_time)?;
        Ok(Self {
            level: raw.level,
            timestamp,
        })
    }
}

/// Parse a feed timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00.000Z`, `…+01:00`). Date-times
/// without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .with_context(|| format!("invalid reading timestamp: '{raw}'"))?;

    Ok(Utc.from_utc_datetime(&naive).into())
}

// ---------------------------------------------------------------------------
// ReadingSeries
// ---------------------------------------------------------------------------

/// Ordered readings from one feed poll, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReadingSeries {
    readings: Vec<Reading>,
}

impl ReadingSeries {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn as_slice(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Most recent reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// Reading just before the most recent one.
    pub fn previous(&self) -> Option<&Reading> {
        let len = self.readings.len();
        if len < 2 {
            return None;
        }
        self.readings.get(len - 2)
    }

    /// The last `n` readings (or all of them when fewer exist).
    pub fn recent(&self, n: usize) -> &[Reading] {
        let start = self.readings.len().saturating_sub(n);
        &self.readings[start..]
    }

    /// Report data-quality issues without rejecting the series.
    ///
    /// Estimation never consults these; they are surfaced to the operator.
    pub fn warnings(&self) -> Vec<SeriesWarning> {
        let mut warnings = Vec::new();

        for (index, reading) in self.readings.iter().enumerate() {
            if !(0.0..=100.0).contains(&reading.level) {
                warnings.push(SeriesWarning::LevelOutOfRange {
                    index,
                    level: reading.level,
                });
            }
        }

        for (index, pair) in self.readings.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                warnings.push(SeriesWarning::OutOfOrder { index: index + 1 });
            }
        }

        warnings
    }
}

impl From<Vec<Reading>> for ReadingSeries {
    fn from(readings: Vec<Reading>) -> Self {
        Self::new(readings)
    }
}

impl FromIterator<Reading> for ReadingSeries {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A data-quality issue found in a series.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesWarning {
    /// Level outside `[0, 100]`.
    LevelOutOfRange { index: usize, level: f64 },
    /// Reading is older than the one before it.
    OutOfOrder { index: usize },
}

impl fmt::Display for SeriesWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelOutOfRange { index, level } => {
                write!(f, "reading #{index} has level {level} outside 0-100")
            }
            Self::OutOfOrder { index } => {
                write!(f, "reading #{index} is older than the reading before it")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Feed document
// ---------------------------------------------------------------------------

/// Envelope returned by the reading feed.
#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<Reading>>,
}

/// Decode a feed document into a series.
///
/// Returns `Ok(None)` when the feed reports no usable data
/// (`success: false`, missing `data`, or an empty array). A bare JSON array
/// of readings is accepted as well, for locally saved dumps. Malformed
/// readings, including bad timestamps, are an error.
pub fn decode_feed(body: &str) -> Result<Option<ReadingSeries>> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("feed response is not valid JSON")?;

    let readings = if value.is_array() {
        let readings: Vec<Reading> =
            serde_json::from_value(value).context("invalid reading in feed data")?;
        Some(readings)
    } else {
        let envelope: FeedEnvelope =
            serde_json::from_value(value).context("invalid feed document")?;
        if envelope.success { envelope.data } else { None }
    };

    Ok(readings
        .filter(|r| !r.is_empty())
        .map(ReadingSeries::new))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
