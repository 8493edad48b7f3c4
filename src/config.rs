//! CLI configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use jiff::Timestamp;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

/// Trellis promotion fixtures CLI
#[derive(Debug, Parser)]
#[command(name = "trellis", about = "Trellis promotion engine", long_about = None)]
pub struct Config {
    /// Directory holding `catalog/`, `promotions/` and `orders/` fixture sets
    #[arg(
        long,
        env = "TRELLIS_FIXTURES_DIR",
        default_value = "./fixtures",
        global = true
    )]
    pub fixtures_dir: PathBuf,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate every promotion in a fixture set
    Validate(ValidateArgs),

    /// Evaluate every promotion against the orders in a fixture set
    Evaluate(EvaluateArgs),
}

/// Arguments for `validate`.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Fixture set name
    #[arg(short, long)]
    pub fixture: String,
}

/// Arguments for `evaluate`.
#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Fixture set name
    #[arg(short, long)]
    pub fixture: String,

    /// Only evaluate this order
    #[arg(short, long)]
    pub order: Option<String>,

    /// Evaluation instant (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<Timestamp>,
}

impl Config {
    /// Load configuration from `.env`, the environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // A missing .env file is fine
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}
