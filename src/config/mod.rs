//! Configuration system for tankwatch.
//!
//! Provides a layered configuration hierarchy:
//!
//! 1. **Built-in defaults**: hardcoded in [`schema::TankwatchConfig::default()`]
//! 2. **User global config**: `~/.tankwatch/config.toml`
//! 3. **Project local config**: `.tankwatch.toml` in the current working directory
//! 4. **Environment variables**: `TANKWATCH_*` overrides (highest precedence)
//!
//! Later layers override earlier ones. Missing sections in a TOML file fall
//! back to defaults.
//!
//! The data directory (global config, logs) is `~/.tankwatch`, or the value
//! of `TANKWATCH_HOME` when set.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::TankwatchConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved tankwatch configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. Keys set in a later file win; keys it leaves out keep the value
/// from the earlier layers.
pub fn load() -> TankwatchConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the TOML files at `paths` (lowest precedence first) over defaults.
fn load_layers(paths: &[Option<PathBuf>]) -> TankwatchConfig {
    let mut merged = toml::Table::new();
    for path in paths.iter().flatten() {
        if let Some(layer) = load_toml_table(path) {
            merge_tables(&mut merged, layer);
        }
    }

    match toml::Value::Table(merged).try_into::<TankwatchConfig>() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tankwatch: ignoring config files: {e}");
            TankwatchConfig::default()
        }
    }
}

/// Read one config layer as a raw TOML table.
///
/// A file must deserialize as a complete [`TankwatchConfig`] on its own to be
/// used. Malformed files are reported on stderr and skipped so a typo never
/// stops the dashboard from starting.
fn load_toml_table(path: &Path) -> Option<toml::Table> {
    let content = fs::read_to_string(path).ok()?;
    let checked = toml::from_str::<TankwatchConfig>(&content)
        .and_then(|_| toml::from_str::<toml::Table>(&content));
    match checked {
        Ok(table) => Some(table),
        Err(e) => {
            eprintln!("tankwatch: ignoring malformed {}: {e}", path.display());
            None
        }
    }
}

/// Overlay `overlay` onto `base`, recursing into tables present in both.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Data directory: `$TANKWATCH_HOME` or `~/.tankwatch`.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("TANKWATCH_HOME")
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(".tankwatch"))
}

fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".tankwatch.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `TANKWATCH_FEED_URL`: reading feed URL
/// - `TANKWATCH_FEED_TIMEOUT_SECS`: request timeout
/// - `TANKWATCH_CACHE_TTL_SECS`: fetch cache TTL
/// - `TANKWATCH_REFRESH_SECS`: refresh interval
/// - `TANKWATCH_BIND`: dashboard bind address
/// - `TANKWATCH_AUTH`: login gate (`1`/`true`/`yes`/`on`)
/// - `TANKWATCH_LOGGING`: event and poll logs
fn apply_env_overrides(config: &mut TankwatchConfig) {
    if let Ok(val) = std::env::var("TANKWATCH_FEED_URL")
        && !val.is_empty()
    {
        config.feed.url = val;
    }
    if let Some(secs) = env_u64("TANKWATCH_FEED_TIMEOUT_SECS") {
        config.feed.timeout_secs = secs;
    }
    if let Some(secs) = env_u64("TANKWATCH_CACHE_TTL_SECS") {
        config.feed.cache_ttl_secs = secs;
    }
    if let Some(secs) = env_u64("TANKWATCH_REFRESH_SECS") {
        config.dashboard.refresh_secs = secs;
    }
    if let Ok(val) = std::env::var("TANKWATCH_BIND")
        && !val.is_empty()
    {
        config.dashboard.bind = val;
    }
    if let Ok(val) = std::env::var("TANKWATCH_AUTH") {
        config.auth.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("TANKWATCH_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to the global config path.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create tankwatch data directory")?;
    }

    fs::write(&path, TankwatchConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `feed.url` or `auth.users.admin`. The existing
/// value's type decides how `value` is parsed.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let source = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&TankwatchConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&source).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject edits that would make the file unloadable.
    let updated = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<TankwatchConfig>(&updated)
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// Intermediate tables must already exist, except under `auth.users` where
/// new usernames may be added.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((&leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let adding_user = sections == ["auth", "users"];
    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected number for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::Table(_)) => {
            anyhow::bail!("'{key}' is a section, not a value")
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None if adding_user => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML, with passwords masked.
pub fn show_effective_config() -> Result<String> {
    render_masked(load())
}

fn render_masked(mut config: TankwatchConfig) -> Result<String> {
    for password in config.auth.users.values_mut() {
        *password = "********".to_string();
    }
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults_value() -> toml::Value {
        let text = toml::to_string_pretty(&TankwatchConfig::default()).unwrap();
        toml::from_str(&text).unwrap()
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root = defaults_value();
        set_toml_value(&mut root, "feed.url", "https://example.com/feed").unwrap();
        assert_eq!(root["feed"]["url"].as_str(), Some("https://example.com/feed"));
    }

    #[test]
    fn set_toml_value_updates_bool_and_integer() {
        let mut root = defaults_value();
        set_toml_value(&mut root, "auth.enabled", "off").unwrap();
        set_toml_value(&mut root, "dashboard.refresh_secs", "60").unwrap();
        assert_eq!(root["auth"]["enabled"].as_bool(), Some(false));
        assert_eq!(root["dashboard"]["refresh_secs"].as_integer(), Some(60));
    }

    #[test]
    fn set_toml_value_updates_float() {
        let mut root = defaults_value();
        set_toml_value(&mut root, "estimator.tolerance", "7.5").unwrap();
        let tolerance = root["estimator"]["tolerance"].as_float().unwrap();
        assert!((tolerance - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn set_toml_value_adds_users() {
        let mut root = defaults_value();
        set_toml_value(&mut root, "auth.users.admin", "secret").unwrap();
        assert_eq!(root["auth"]["users"]["admin"].as_str(), Some("secret"));
    }

    #[test]
    fn set_toml_value_rejects_unknown_and_bad_values() {
        let mut root = defaults_value();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "feed.bogus", "value").is_err());
        assert!(set_toml_value(&mut root, "feed.timeout_secs", "soon").is_err());
        assert!(set_toml_value(&mut root, "auth.users", "x").is_err());
        assert!(set_toml_value(&mut root, "", "x").is_err());
    }

    #[test]
    fn rendered_config_masks_passwords() {
        let mut config = TankwatchConfig::default();
        config.auth.users.insert("admin".to_string(), "s3cret".to_string());
        config.feed.url = "http://feed/exec".to_string();

        let toml_str = render_masked(config).unwrap();
        assert!(!toml_str.contains("s3cret"));

        let parsed: TankwatchConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.auth.users["admin"], "********");
        assert_eq!(parsed.feed.url, "http://feed/exec");
    }

    fn temp_layer(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tankwatch-layers-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn project_layer_keeps_unset_global_keys() {
        let global = temp_layer(
            "global.toml",
            "[feed]\nurl = \"http://global/feed\"\ntimeout_secs = 20\n\n[auth.users]\nadmin = \"pw\"\n",
        );
        let project = temp_layer(
            "project.toml",
            "[dashboard]\nbind = \"0.0.0.0:9000\"\n\n[feed]\ntimeout_secs = 3\n\n[auth.users]\nviewer = \"look\"\n",
        );

        let config = load_layers(&[Some(global.clone()), Some(project.clone())]);
        fs::remove_file(global).unwrap();
        fs::remove_file(project).unwrap();

        assert_eq!(config.dashboard.bind, "0.0.0.0:9000");
        assert_eq!(config.feed.url, "http://global/feed");
        assert_eq!(config.feed.timeout_secs, 3);
        assert_eq!(config.auth.users.len(), 2);
        assert_eq!(config.auth.users["admin"], "pw");
        // Untouched sections keep their defaults.
        assert_eq!(config.dashboard.refresh_secs, 300);
        assert!(config.auth.enabled);
    }

    #[test]
    fn malformed_layer_is_skipped() {
        let global = temp_layer("good.toml", "[feed]\nurl = \"http://global/feed\"\n");
        let broken = temp_layer("broken.toml", "[feed]\ntimeout_secs = \"soon\"\n");

        let config = load_layers(&[Some(global.clone()), Some(broken.clone()), None]);
        fs::remove_file(global).unwrap();
        fs::remove_file(broken).unwrap();

        assert_eq!(config.feed.url, "http://global/feed");
        assert_eq!(config.feed.timeout_secs, 10);
    }

    #[test]
    fn merge_tables_recurses_into_sections() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Table = toml::from_str("[a]\ny = 3\n[b]\nz = 4\n").unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert_eq!(base["b"]["z"].as_integer(), Some(4));
    }
}
