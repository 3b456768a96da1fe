//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::resolver::parse_define;

/// Runtime configuration store for the scouter host agent.
#[derive(Parser, Debug)]
#[command(name = "scouter-conf", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file (defaults to the `scouter.config`
    /// system property, then ./conf/scouter.conf).
    #[arg(short, long, env = "SCOUTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// System property override, e.g. `-D net_collector_ip=10.0.0.5`. Repeatable.
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_define, global = true)]
    pub defines: Vec<(String, String)>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep the store loaded and hot-reloading until interrupted.
    Run,

    /// Show every setting with its current and default value.
    #[command(name = "config-show")]
    ConfigShow {
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List compiled-in defaults.
    #[command(name = "config-defaults")]
    ConfigDefaults,

    /// Print the resolved value of one key.
    #[command(name = "config-get")]
    ConfigGet {
        /// The configuration key.
        key: String,
    },

    /// Load the file once and report its mtime, entry count and fingerprint.
    #[command(name = "config-status")]
    ConfigStatus,

    /// Print the raw configuration file.
    #[command(name = "config-text")]
    ConfigText,

    /// Replace the configuration file with the contents of another file.
    #[command(name = "config-write")]
    ConfigWrite {
        /// Source file, or `-` for stdin.
        source: PathBuf,
    },
}

/// Output format for `config-show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    Table,
    /// Column-oriented JSON object.
    Json,
    /// Row-oriented YAML list.
    Yaml,
}
