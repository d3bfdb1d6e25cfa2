//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Interface to bind (overrides configuration)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    /// Apply the command line overrides to `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// File to write (defaults to the configured export file)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
