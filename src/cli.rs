// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `monorun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "monorun",
    version,
    about = "Discover every package of a monorepo and run its scripts with bounded parallelism.",
    long_about = None
)]
pub struct CliArgs {
    /// Root of the source tree to scan for units.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub root: PathBuf,

    /// Path to the config file (TOML).
    ///
    /// Default: `Monorun.toml` in the root, if it exists.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Maximum number of units processed at once.
    ///
    /// Overrides `MONORUN_CONCURRENCY` and `[config].concurrency`.
    #[arg(short = 'j', long, value_name = "K", global = true)]
    pub concurrency: Option<usize>,

    /// Only select units whose name matches this glob (repeatable).
    #[arg(long = "filter", value_name = "GLOB", global = true)]
    pub filters: Vec<String>,

    /// Run units one at a time, in discovery order.
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Print what would run, but don't execute any commands.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Disable colored unit names.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MONORUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List discovered units and their selection state.
    List,
    /// Run a named script in every selected unit that declares it.
    Run {
        /// Script name as declared in the manifest.
        script: String,
    },
    /// Run the `build` script in every unit marked for build.
    Build,
    /// Run the `clean` script in every selected unit that declares it.
    Clean,
    /// Run the install command in every selected unit.
    Install,
    /// Point dependencies on local units at their current versions.
    Sync,
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
