//! CLI command implementations for tankwatch.
//!
//! Provides subcommand handlers for:
//! - `tankwatch status`: one pipeline cycle, printed as a table or JSON
//! - `tankwatch watch`: repeat the cycle on a fixed interval
//! - `tankwatch estimate`: timing estimate for a saved feed document
//! - `tankwatch serve`: start the web dashboard
//! - `tankwatch history`: recent entries from the poll log
//! - `tankwatch health`: check config, feed and log files
//! - `tankwatch config show|init|set|reset`: configuration management

use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use crate::config::{self, TankwatchConfig};
use crate::dashboard::{self, AlertLevel, CycleOutcome, DashboardSettings, Snapshot};
use crate::feed::{CachedSource, FileFeed, HttpFeed, ReadingSource};
use crate::logging::polls::{self, PollLogEntry};
use crate::logging::{self, log_event};
use crate::web;

/// Output format for reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// tankwatch status
// ---------------------------------------------------------------------------

/// Run one fetch → estimate cycle and print the snapshot.
///
/// Reads from `file` when given, otherwise from the configured feed URL.
pub fn run_status(file: Option<&str>, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    match file {
        Some(path) => status_with(FileFeed::new(path), &cfg, format),
        None => status_with(HttpFeed::from_config(&cfg.feed)?, &cfg, format),
    }
}

fn status_with<S: ReadingSource>(
    source: S,
    cfg: &TankwatchConfig,
    format: OutputFormat,
) -> Result<()> {
    let settings = DashboardSettings::from_config(cfg);
    let mut cached = CachedSource::new(source, cfg.feed.cache_ttl_secs);

    match dashboard::run_cycle(&mut cached, &settings, Utc::now(), cfg.logging.enabled) {
        CycleOutcome::Ready(snapshot) => match format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "available": true,
                    "snapshot": snapshot.view(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            _ => print_snapshot_table(&snapshot),
        },
        CycleOutcome::NoData => match format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "available": false })),
            _ => println!("{}", "No data available.".yellow()),
        },
        CycleOutcome::Failed(message) => {
            if cfg.logging.enabled {
                log_event(&format!("status failed: {message}"));
            }
            anyhow::bail!("could not load readings: {message}");
        }
    }

    Ok(())
}

fn print_snapshot_table(snapshot: &Snapshot) {
    println!("{}", "Water Tank Status".bold().cyan());
    println!("{}", "=".repeat(50));
    println!(
        "  {}",
        colorize_alert(snapshot.alert, &snapshot.alert.message(snapshot.current_level))
    );
    println!();

    println!(
        "  {} {}%",
        "Current level:".bold(),
        snapshot.current_level
    );
    println!(
        "  {} {}",
        "Time to fill: ".bold(),
        snapshot.timing.fill_text().green()
    );
    println!(
        "  {} {}",
        "Time to empty:".bold(),
        snapshot.timing.empty_text().red()
    );
    println!(
        "  {} {} {}",
        "Trend:        ".bold(),
        snapshot.trend.label(),
        snapshot.trend.delta_text().unwrap_or_default().dimmed()
    );
    println!(
        "  {} {} ({})",
        "Last update:  ".bold(),
        snapshot.update_text(),
        snapshot.last_update.format("%d/%m %H:%M")
    );
    println!();

    if !snapshot.history.is_empty() {
        println!("{}", "Recent Readings".bold().cyan());
        println!("  {:<14} {:>7}", "Time", "Level");
        println!("  {}", "-".repeat(22));
        for (i, reading) in snapshot.history.iter().enumerate() {
            let line = format!(
                "  {:<14} {:>6}%",
                reading.timestamp.format("%d/%m %H:%M"),
                reading.level
            );
            if i % 2 == 0 {
                println!("{line}");
            } else {
                println!("{}", line.dimmed());
            }
        }
    }

    for warning in &snapshot.warnings {
        println!("  {} {}", "!".yellow().bold(), warning.yellow());
    }
}

// ---------------------------------------------------------------------------
// tankwatch watch
// ---------------------------------------------------------------------------

/// Poll the feed every `interval` seconds, printing one line per cycle.
///
/// Runs forever unless `cycles` is given. A failed cycle is reported and
/// the loop carries on.
pub fn run_watch(file: Option<&str>, interval: Option<u64>, cycles: Option<u32>) -> Result<()> {
    if file == Some("-") {
        anyhow::bail!(
            "watch cannot poll stdin: it is consumed by the first cycle. Pass a file path, \
             or pipe the document into `tankwatch status --file -` for a single reading."
        );
    }
    let cfg = config::load();
    let interval = Duration::from_secs(interval.unwrap_or(cfg.dashboard.refresh_secs).max(1));
    match file {
        Some(path) => watch_with(FileFeed::new(path), &cfg, interval, cycles),
        None => watch_with(HttpFeed::from_config(&cfg.feed)?, &cfg, interval, cycles),
    }
}

fn watch_with<S: ReadingSource>(
    source: S,
    cfg: &TankwatchConfig,
    interval: Duration,
    cycles: Option<u32>,
) -> Result<()> {
    let settings = DashboardSettings::from_config(cfg);
    let mut cached = CachedSource::new(source, cfg.feed.cache_ttl_secs);

    println!(
        "{} {} every {}s (Ctrl+C to stop)",
        "Watching".bold().cyan(),
        cached.source().describe(),
        interval.as_secs()
    );

    let mut completed = 0u32;
    loop {
        let outcome = dashboard::run_cycle(&mut cached, &settings, Utc::now(), cfg.logging.enabled);
        println!("{}", watch_line(&outcome));
        if let CycleOutcome::Failed(message) = &outcome
            && cfg.logging.enabled
        {
            log_event(&format!("watch cycle failed: {message}"));
        }

        completed += 1;
        if cycles.is_some_and(|limit| completed >= limit) {
            break;
        }
        thread::sleep(interval);
    }

    Ok(())
}

fn watch_line(outcome: &CycleOutcome) -> String {
    let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
    match outcome {
        CycleOutcome::Ready(snapshot) => format!(
            "[{}] {} {:>5}%  fill {}  empty {}  {}  ({})",
            stamp.dimmed(),
            colorize_alert(snapshot.alert, &format!("{:<8}", snapshot.alert.to_string())),
            snapshot.current_level,
            snapshot.timing.fill_text(),
            snapshot.timing.empty_text(),
            snapshot.trend.label(),
            snapshot.update_text()
        ),
        CycleOutcome::NoData => format!("[{}] {}", stamp.dimmed(), "no data".yellow()),
        CycleOutcome::Failed(message) => {
            format!("[{}] {} {}", stamp.dimmed(), "error".red().bold(), message)
        }
    }
}

// ---------------------------------------------------------------------------
// tankwatch estimate
// ---------------------------------------------------------------------------

/// Estimate fill/empty times for a saved feed document (`-` for stdin).
pub fn run_estimate(path: &str, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let feed = FileFeed::new(path);
    let estimator = DashboardSettings::from_config(&cfg).estimator();

    let Some(series) = feed.fetch()? else {
        match format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "available": false })),
            _ => println!("{}", "No readings in feed document.".yellow()),
        }
        return Ok(());
    };

    let timing = estimator.estimate(series.as_slice());

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "available": true,
                "readings": series.len(),
                "tolerance": estimator.tolerance(),
                "timing": timing.view(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            println!("{}", "Timing Estimate".bold().cyan());
            println!("{}", "=".repeat(40));
            println!("  {} {}", "Source:       ".bold(), feed.describe());
            println!("  {} {}", "Readings:     ".bold(), series.len());
            println!("  {} {}", "Tolerance:    ".bold(), estimator.tolerance());
            println!("  {} {}", "Time to fill: ".bold(), timing.fill_text().green());
            println!("  {} {}", "Time to empty:".bold(), timing.empty_text().red());
            for warning in series.warnings() {
                println!("  {} {}", "!".yellow().bold(), warning.to_string().yellow());
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// tankwatch serve
// ---------------------------------------------------------------------------

/// Start the web dashboard on `addr` (or the configured bind address).
pub fn run_serve(addr: Option<&str>) -> Result<()> {
    let cfg = config::load();
    let addr = addr.unwrap_or(&cfg.dashboard.bind).to_string();
    web::serve(&cfg, &addr)
}

// ---------------------------------------------------------------------------
// tankwatch history
// ---------------------------------------------------------------------------

/// Show the newest `limit` poll log entries.
pub fn run_history(limit: usize, format: OutputFormat) -> Result<()> {
    let entries = polls::read_recent(limit);

    if entries.is_empty() {
        println!(
            "{}",
            "No poll history yet. Run `tankwatch status` or `tankwatch watch` first.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => print!("{}", history_csv(&entries)),
        OutputFormat::Table => print_history_table(&entries),
    }

    Ok(())
}

fn print_history_table(entries: &[PollLogEntry]) {
    println!("{}", "Poll History".bold().cyan());
    println!(
        "  {:<20} {:<6} {:>8} {:>7} {:>10} {:>10}",
        "Time", "Status", "Readings", "Level", "Fill", "Empty"
    );
    println!("  {}", "-".repeat(66));

    for entry in entries {
        let time = chrono::DateTime::parse_from_rfc3339(&entry.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| entry.timestamp.clone());
        let status = if entry.success {
            "ok".green()
        } else {
            "error".red()
        };
        let level = entry
            .current_level
            .map(|l| format!("{l}%"))
            .unwrap_or_else(|| "--".to_string());

        println!(
            "  {:<20} {:<6} {:>8} {:>7} {:>10} {:>10}",
            time,
            status,
            entry.readings,
            level,
            minutes_or_dash(entry.fill_minutes),
            minutes_or_dash(entry.empty_minutes),
        );
        if let Some(error) = &entry.error {
            println!("    {}", error.dimmed());
        }
    }
}

fn history_csv(entries: &[PollLogEntry]) -> String {
    let mut out =
        String::from("timestamp,source,success,readings,current_level,fill_minutes,empty_minutes,error\n");
    for e in entries {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            e.timestamp,
            csv_field(&e.source),
            e.success,
            e.readings,
            e.current_level.map(|l| l.to_string()).unwrap_or_default(),
            e.fill_minutes.map(|m| m.to_string()).unwrap_or_default(),
            e.empty_minutes.map(|m| m.to_string()).unwrap_or_default(),
            csv_field(e.error.as_deref().unwrap_or_default()),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn minutes_or_dash(minutes: Option<i64>) -> String {
    minutes
        .map(crate::estimator::format_minutes)
        .unwrap_or_else(|| crate::estimator::UNDETERMINED.to_string())
}

// ---------------------------------------------------------------------------
// tankwatch health
// ---------------------------------------------------------------------------

/// Check configuration, feed reachability and log files.
pub fn run_health() -> Result<()> {
    println!("{}", "tankwatch Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    // 1. Config files
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.tankwatch/config.toml found"
        } else {
            "not found (run `tankwatch config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".tankwatch.toml found"
        } else {
            "none (optional)"
        },
    );

    // 2. Feed
    match HttpFeed::from_config(&cfg.feed) {
        Ok(feed) => match feed.fetch() {
            Ok(Some(series)) => print_health_item(
                "Feed",
                true,
                &format!("{} readings from {}", series.len(), feed.url()),
            ),
            Ok(None) => print_health_item("Feed", true, "reachable, no data"),
            Err(e) => print_health_item("Feed", false, &format!("{e:#}")),
        },
        Err(_) => print_health_item(
            "Feed",
            false,
            "no URL (run `tankwatch config set feed.url <URL>`)",
        ),
    }

    // 3. Login gate
    if cfg.auth.enabled {
        let users = cfg.auth.users.len();
        print_health_item(
            "Dashboard login",
            users > 0,
            &if users > 0 {
                format!("{users} user(s) configured")
            } else {
                "enabled but no users (`tankwatch serve` will refuse to start)".to_string()
            },
        );
    } else {
        print_health_item("Dashboard login", true, "disabled");
    }

    // 4. Log files
    let poll_log = polls::poll_log_path();
    let poll_exists = poll_log.as_ref().is_some_and(|p| p.exists());
    print_health_item(
        "Poll log",
        poll_exists || !cfg.logging.enabled,
        &match (&poll_log, cfg.logging.enabled) {
            (_, false) => "logging disabled".to_string(),
            (Some(p), true) if poll_exists => {
                format!("{} ({} entries)", p.display(), polls::read_all_entries().len())
            }
            (Some(p), true) => format!("{} (not created yet)", p.display()),
            (None, true) => "no home directory".to_string(),
        },
    );
    let event_log = logging::events::event_log_path();
    print_health_item(
        "Event log",
        true,
        &event_log
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no home directory".to_string()),
    );

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let icon = if ok { "✓".green() } else { "✗".red() };
    println!("  {icon} {:<16} {}", name.bold(), detail.dimmed());
}

// ---------------------------------------------------------------------------
// tankwatch config
// ---------------------------------------------------------------------------

/// Print the effective merged configuration and its sources.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective tankwatch Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.tankwatch/config.toml");
    print_source(project_exists, ".tankwatch.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "TANKWATCH_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, label: &str) {
    if exists {
        println!("  {} {}", "✓".green(), label.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.tankwatch/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Set feed.url and add a dashboard user under [auth.users].".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    let shown = if key.starts_with("auth.users.") {
        "********"
    } else {
        value
    };
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), shown);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn colorize_alert(alert: AlertLevel, text: &str) -> colored::ColoredString {
    match alert {
        AlertLevel::Critical => text.red().bold(),
        AlertLevel::Warning => text.yellow().bold(),
        AlertLevel::Ok => text.green(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_rejects_stdin_feed() {
        let err = run_watch(Some("-"), Some(1), Some(1)).unwrap_err();
        assert!(err.to_string().contains("cannot poll stdin"));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_history_csv_rows() {
        let mut ok = PollLogEntry::now("http://feed", true);
        ok.timestamp = "2024-05-01T12:00:00+00:00".to_string();
        ok.readings = 3;
        ok.current_level = Some(42.5);
        ok.fill_minutes = Some(75);

        let mut failed = PollLogEntry::now("http://feed", false);
        failed.timestamp = "2024-05-01T12:05:00+00:00".to_string();
        failed.error = Some("timed out, retrying".to_string());

        let csv = history_csv(&[ok, failed]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "2024-05-01T12:00:00+00:00,http://feed,true,3,42.5,75,,"
        );
        assert_eq!(
            lines[2],
            "2024-05-01T12:05:00+00:00,http://feed,false,0,,,,\"timed out, retrying\""
        );
    }

    #[test]
    fn test_minutes_or_dash() {
        assert_eq!(minutes_or_dash(None), "--");
        assert_eq!(minutes_or_dash(Some(40)), "40 min");
        assert_eq!(minutes_or_dash(Some(90)), "1h 30min");
    }

    #[test]
    fn test_watch_line_reports_failures() {
        colored::control::set_override(false);
        let line = watch_line(&CycleOutcome::Failed("connection refused".to_string()));
        assert!(line.contains("error connection refused"));
        assert!(watch_line(&CycleOutcome::NoData).ends_with("no data"));
    }
}
