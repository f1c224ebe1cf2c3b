use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config;

// ---------------------------------------------------------------------------
// Poll log entry (JSONL)
// ---------------------------------------------------------------------------

/// One pipeline cycle as recorded in `poll-log.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollLogEntry {
    pub timestamp: String,
    /// Feed URL or file the series came from.
    pub source: String,
    /// Whether the fetch and decode succeeded (a "no data" answer counts).
    pub success: bool,
    /// Number of readings in the fetched series.
    #[serde(default)]
    pub readings: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fill_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub empty_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl PollLogEntry {
    /// Start an entry stamped with the current time.
    pub fn now(source: impl Into<String>, success: bool) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            source: source.into(),
            success,
            readings: 0,
            current_level: None,
            fill_minutes: None,
            empty_minutes: None,
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Append an entry to the poll log. Best-effort.
pub fn record(entry: &PollLogEntry) {
    if let Some(path) = poll_log_path() {
        let _ = append_entry(&path, entry);
    }
}

fn append_entry(path: &Path, entry: &PollLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every entry in the poll log, skipping malformed lines.
pub fn read_all_entries() -> Vec<PollLogEntry> {
    poll_log_path()
        .map(|path| read_entries_from(&path))
        .unwrap_or_default()
}

/// The newest `limit` entries, oldest first.
pub fn read_recent(limit: usize) -> Vec<PollLogEntry> {
    let mut entries = read_all_entries();
    let start = entries.len().saturating_sub(limit);
    entries.drain(..start);
    entries
}

fn read_entries_from(path: &Path) -> Vec<PollLogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str::<PollLogEntry>(&line).ok())
        .collect()
}

/// Path to the poll log file.
pub fn poll_log_path() -> Option<PathBuf> {
    config::data_dir().map(|dir| dir.join("poll-log.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tankwatch-{name}-{}.jsonl",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn entries_round_trip_and_skip_garbage() {
        let path = temp_log("polls");

        let mut ok = PollLogEntry::now("http://feed", true);
        ok.readings = 12;
        ok.current_level = Some(64.0);
        ok.fill_minutes = Some(90);
        append_entry(&path, &ok).unwrap();

        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "{{not json"))
            .unwrap();

        let mut failed = PollLogEntry::now("http://feed", false);
        failed.error = Some("timed out".to_string());
        append_entry(&path, &failed).unwrap();

        let entries = read_entries_from(&path);
        assert_eq!(entries, vec![ok, failed]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn optional_fields_are_omitted() {
        let entry = PollLogEntry::now("feed.json", true);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("current_level"));
        assert!(!json.contains("error"));
        assert!(json.contains("\"readings\":0"));
    }

    #[test]
    fn missing_log_reads_empty() {
        assert!(read_entries_from(Path::new("/definitely/not/here.jsonl")).is_empty());
    }
}
