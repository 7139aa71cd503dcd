//! CLI argument definitions for the shelfcall binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shelfcall_core::types::Priority;

/// shelfcall - spoken inventory alerts on a schedule.
#[derive(Parser, Debug)]
#[command(name = "shelfcall", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Announce alerts on the configured schedule until interrupted.
    Run {
        /// JSON file with an array of alerts to load.
        #[arg(long = "alerts")]
        alerts: Option<PathBuf>,

        /// Load the built-in sample alerts.
        #[arg(long = "demo")]
        demo: bool,

        /// Override the poll interval in minutes.
        #[arg(long = "poll-minutes")]
        poll_minutes: Option<u32>,

        /// Run a single tick, wait for it to finish, and exit.
        #[arg(long = "once")]
        once: bool,
    },

    /// Speak a test message with the default voice.
    Say {
        message: String,
    },

    /// Play the attention tone for a priority.
    Tone {
        #[arg(default_value = "critical")]
        priority: Priority,
    },

    /// List the voices the speech backend offers.
    Voices,

    /// Print the effective configuration.
    Config {
        /// Write it to the config file path.
        #[arg(long = "write")]
        write: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SHELFCALL_CONFIG env var > ~/.shelfcall/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SHELFCALL_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// The subcommand to run; a bare invocation runs the scheduler.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run {
            alerts: None,
            demo: false,
            poll_minutes: None,
            once: false,
        })
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".shelfcall").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".shelfcall").join("config.toml");
    }
    PathBuf::from("config.toml")
}
