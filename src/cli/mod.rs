// Command Line Interface Module
// Clap definitions and colored status helpers

pub mod commands;

use clap::{Parser, Subcommand};
use colored::*;

/// Vigil - process shutdown coordinator with audited stop requests
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author = "Vigil Team")]
#[command(version)]
#[command(about = "Runs until SIGINT/SIGTERM or an audited stop request", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run until a shutdown signal or stop request arrives
    Run {
        /// Configuration file path
        #[arg(short, long, default_value = "vigil.toml")]
        config: String,

        /// Request an audited stop after this many seconds
        #[arg(long, requires = "reason")]
        stop_after: Option<u64>,

        /// Reason recorded with the stop request
        #[arg(long, requires = "stop_after")]
        reason: Option<String>,
    },

    /// Check for a newer release
    Update {
        /// Configuration file path
        #[arg(short, long, default_value = "vigil.toml")]
        config: String,
    },

    /// Read or write the preference file
    Prefs {
        /// Configuration file path
        #[arg(short, long, default_value = "vigil.toml")]
        config: String,

        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[arg(short, long, default_value = "vigil.toml")]
        file: String,
    },
}

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print a preference value
    Get { key: String },

    /// Set a preference value
    Set { key: String, value: String },
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}
