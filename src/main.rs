use anyhow::Result;
use clap::{Parser, Subcommand};

use tankwatch::cli;

#[derive(Debug, Parser)]
#[command(name = "tankwatch")]
#[command(about = "Water tank level monitor with fill/empty time estimates")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the latest readings once and show the tank status
    Status {
        /// Read a saved feed document instead of the configured URL (`-` for stdin)
        #[arg(long)]
        file: Option<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Poll the feed on a fixed interval and print one line per cycle
    Watch {
        /// Re-read a feed document file instead of the configured URL (stdin is not accepted)
        #[arg(long)]
        file: Option<String>,
        /// Seconds between cycles (default: dashboard.refresh_secs)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after N cycles
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Estimate fill/empty times for a feed document on disk or stdin
    Estimate {
        /// Path to the feed document, or `-` for stdin
        #[arg(default_value = "-")]
        path: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Start the web dashboard
    Serve {
        /// Address to bind (default: dashboard.bind)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show recent entries from the poll log
    History {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check config, feed reachability and log files
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective merged configuration
    Show,
    /// Write a default config file to ~/.tankwatch/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `feed.url` or `auth.users.admin`
    Set { key: String, value: String },
    /// Reset the config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Status { file, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_status(file.as_deref(), fmt)
        }
        Commands::Watch {
            file,
            interval,
            cycles,
        } => cli::run_watch(file.as_deref(), interval, cycles),
        Commands::Estimate { path, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_estimate(&path, fmt)
        }
        Commands::Serve { addr } => cli::run_serve(addr.as_deref()),
        Commands::History { limit, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_history(limit, fmt)
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
