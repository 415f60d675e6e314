//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "loom",
    version,
    about = "Schedule a task tree and run workers until it completes.",
    long_about = None
)]
pub struct CliArgs {
    /// Task tree to schedule (JSON). Defaults to a small kitchen recipe.
    #[arg(long, value_name = "PATH")]
    pub spec: Option<PathBuf>,

    /// Workers per task type.
    #[arg(long, default_value_t = 2)]
    pub workers: usize,

    /// Simulated work per task, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub work_ms: u64,

    /// Key namespace. Overrides `LOOM_NAMESPACE`.
    #[arg(long)]
    pub namespace: Option<String>,

    /// Logging level. If omitted, `LOOM_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
