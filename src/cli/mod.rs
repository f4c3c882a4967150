//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for the audio-arbiter
//! diagnostic binary.

use clap::{Parser, Subcommand};

use crate::policy::Category;

#[derive(Parser, Debug, Clone)]
#[command(name = "audio-arbiter")]
#[command(about = "Audio session interrupt arbitration")]
#[command(long_about = "Inspect the audio interrupt policy table and arbiter configuration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Inspect the interrupt policy table
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Policy {
            action: PolicyAction::Table { json: false },
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum PolicyAction {
    /// Print the full decision table (rows: existing, columns: incoming)
    Table {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Look up a single decision
    Lookup {
        /// Category of the session already playing
        existing: Category,
        /// Category of the session asking to start
        incoming: Category,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }
}
