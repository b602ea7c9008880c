// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `spkforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spkforge",
    version,
    about = "Resolve project dependencies and drive per-platform package builds.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Spkforge.toml` in the current working directory. A missing
    /// default file means built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPKFORGE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print projects in dependency order.
    Depends(DependsArgs),
    /// Resolve the build set of a package.
    Resolve(ResolveArgs),
    /// Incremental build sessions for wrapper scripts.
    #[command(subcommand)]
    Traverse(TraverseCommand),
    /// Report dependency cycles.
    Check(CheckArgs),
    /// Resolve a package and run the configured stages.
    Build(BuildArgs),
}

/// Target platforms, space separated or repeated.
#[derive(Debug, Clone, Default, Args)]
pub struct PlatformArgs {
    #[arg(short = 'p', long = "platform", value_name = "PLATFORMS", value_delimiter = ' ')]
    pub platforms: Vec<String>,
}

impl PlatformArgs {
    /// Platforms with blanks dropped (`-p ""` selects none).
    pub fn list(&self) -> Vec<String> {
        self.platforms
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Args)]
pub struct DependsArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Expand dependencies to LEVEL (0 = unlimited).
    #[arg(short = 'x', value_name = "LEVEL", conflicts_with = "reverse")]
    pub forward: Option<usize>,

    /// Expand dependents to LEVEL (0 = unlimited).
    #[arg(short = 'r', value_name = "LEVEL")]
    pub reverse: Option<usize>,

    /// Prepend the kernel header projects.
    #[arg(long)]
    pub header: bool,

    /// Projects to order. Without `-x`/`-r` only these come back.
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Resolution depth (0 = unlimited).
    #[arg(short = 'x', value_name = "LEVEL", default_value_t = 0)]
    pub depth: usize,

    /// Skip the branch/tag conflict check.
    #[arg(long)]
    pub no_conflict_check: bool,

    /// Print the build set as JSON.
    #[arg(long)]
    pub json: bool,

    /// Package (root project) to resolve.
    pub package: String,
}

#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Session key. Defaults to the parent process id, so one wrapper script
    /// drives one session.
    #[arg(long, value_name = "KEY")]
    pub session: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TraverseCommand {
    /// Start a session with PROJECTS queued.
    Init {
        #[command(flatten)]
        session: SessionArgs,
        #[command(flatten)]
        platform: PlatformArgs,
        /// Walk dependents first (removal order).
        #[arg(short = 'r')]
        reverse: bool,
        projects: Vec<String>,
    },
    /// Report PROJECTS as built and print the next batch.
    Next {
        #[command(flatten)]
        session: SessionArgs,
        /// Batch size (0 = everything ready).
        #[arg(short = 'c', value_name = "COUNT", default_value_t = 0)]
        count: usize,
        projects: Vec<String>,
    },
    /// Report PROJECTS as failed and print what gets skipped.
    Failed {
        #[command(flatten)]
        session: SessionArgs,
        projects: Vec<String>,
    },
    /// Print the session summary.
    Show {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Delete the session.
    Purge {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Check the 64-bit section instead of the generic one.
    #[arg(long)]
    pub arch64: bool,
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Resolution depth (0 = unlimited).
    #[arg(short = 'x', value_name = "LEVEL", default_value_t = 0)]
    pub depth: usize,

    /// Parallel platforms (overrides `config.jobs`).
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Package (root project) to build.
    pub package: String,
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
