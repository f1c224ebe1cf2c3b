use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config;

/// Append a timestamped line to `tankwatch.log`.
pub fn log_event(message: &str) {
    let Some(path) = event_log_path() else {
        return;
    };
    append_line(&path, message);
}

fn append_line(path: &Path, message: &str) {
    if let Some(parent) = path.parent()
        && create_dir_all(parent).is_err()
    {
        return;
    }

    let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let message = message.replace(['\r', '\n'], " ");
    let _ = writeln!(file, "{} {}", Utc::now().to_rfc3339(), message);
}

/// Path to the event log file.
pub fn event_log_path() -> Option<PathBuf> {
    config::data_dir().map(|dir| dir.join("tankwatch.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_line_flattens_newlines() {
        let path = std::env::temp_dir().join(format!("tankwatch-events-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        append_line(&path, "login failed\nuser=admin");
        append_line(&path, "server started");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("login failed user=admin"));
        assert!(lines[1].ends_with("server started"));

        std::fs::remove_file(&path).unwrap();
    }
}
