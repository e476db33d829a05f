// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `replit`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "replit",
    version,
    about = "Re-run an interpreter against a file every time it changes.",
    long_about = "replit opens FILE (or a fresh temporary file) in $VISUAL, \
                  watches it, and re-executes LANG against it on every save, \
                  streaming the output live."
)]
pub struct CliArgs {
    /// A language executable (e.g. python3, node) used to run the file.
    #[arg(value_name = "LANG")]
    pub lang: String,

    /// Optional file to run. A temporary file is created when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// The directory to monitor for changes (only used together with FILE).
    ///
    /// Default: the current working directory.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Path to an optional config file (TOML).
    ///
    /// If omitted, `REPLIT_CONFIG` is consulted; without either, built-in
    /// defaults are used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kill a run that is still active this long after it started when a
    /// new change arrives (e.g. "2s", "500ms").
    #[arg(long, value_name = "DURATION")]
    pub stale_after: Option<String>,

    /// Skip runs when the watched files' contents did not actually change.
    #[arg(long)]
    pub use_hash: bool,

    /// Do not launch an editor.
    #[arg(long)]
    pub no_editor: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REPLIT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
