//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// streamcast - bridge a managed data channel onto UDP recipients
#[derive(Parser, Debug)]
#[command(
    name = "streamcast",
    author,
    version,
    about = "Channel-to-UDP dissemination bridge",
    long_about = "Ingests one named channel from an upstream collaborator, either by\n\
                  tailing a growing byte source or by periodic pull, admits records\n\
                  through numeric range filters, and rebroadcasts each accepted frame\n\
                  as one UDP datagram per configured recipient."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STREAMCAST_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "STREAMCAST_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge
    Run(RunArgs),

    /// Validate configuration without running
    Validate(ValidateArgs),

    /// Display the resolved configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to a configuration file (TOML or JSON); flags override its values
    #[arg(short, long, env = "STREAMCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Upstream collaborator address as host[:port]
    #[arg(short, long, env = "STREAMCAST_SERVER")]
    pub server: Option<String>,

    /// Name of the channel to ingest
    #[arg(short = 'n', long, env = "STREAMCAST_CHANNEL")]
    pub channel: Option<String>,

    /// Preferred local port for the outbound dissemination socket
    #[arg(short = 'p', long, env = "STREAMCAST_SENDER_PORT")]
    pub sender_port: Option<u16>,

    /// Comma-delimited host:port recipient list
    #[arg(short, long, env = "STREAMCAST_RECIPIENTS")]
    pub recipients: Option<String>,

    /// Sleep between periodic-pull requests in milliseconds (0 = as fast as possible)
    #[arg(long, env = "STREAMCAST_FETCH_PERIOD_MS")]
    pub fetch_period_ms: Option<u64>,

    /// Tail a byte source instead of pulling: "tcp:host:port" or "file:/path"
    #[arg(long, value_name = "ENDPOINT", env = "STREAMCAST_TAIL")]
    pub tail: Option<String>,

    /// Start continuous ingestion at the oldest available record
    #[arg(short = 'o', long)]
    pub stream_from_oldest: bool,

    /// Skip the interactive start confirmation
    #[arg(short, long)]
    pub autostart: bool,

    /// Run with no interactive UI; requires autostart and full configuration
    #[arg(long, env = "STREAMCAST_HEADLESS")]
    pub headless: bool,

    /// Path to a range-filter file
    #[arg(long, env = "STREAMCAST_FILTER_FILE")]
    pub filter_file: Option<PathBuf>,

    /// Comma-delimited field names of the channel's records, in payload order
    #[arg(long, value_name = "NAMES", env = "STREAMCAST_FIELD_NAMES")]
    pub field_names: Option<String>,

    /// Fixed reconnect backoff in milliseconds
    #[arg(long, env = "STREAMCAST_RECONNECT_BACKOFF_MS")]
    pub reconnect_backoff_ms: Option<u64>,

    /// Idle sleep after an empty cycle, in milliseconds
    #[arg(long, env = "STREAMCAST_IDLE_INTERVAL_MS")]
    pub idle_interval_ms: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STREAMCAST_METRICS_PORT")]
    pub metrics_port: u16,

    /// Resolve and validate the configuration, then exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file to validate
    #[arg(short, long, default_value = "streamcast.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "streamcast.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the parsed range filters as well
    #[arg(long)]
    pub filters: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
