use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for WalletGuard
#[derive(Parser, Debug)]
#[command(
    name = "walletguard",
    version = env!("CARGO_PKG_VERSION"),
    about = "Session security lifecycle manager for the bill-payment wallet client",
    long_about = "Inspect session tokens, manage session security configuration, and simulate the idle, token-expiry and background-timeout logout policies of the wallet client."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Token inspection commands
    Token(TokenArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Show the last recorded logout
    LastLogout {
        /// Persisted store file
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
    /// Run an interactive session driven from stdin
    Simulate(SimulateArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Token arguments
#[derive(ClapArgs, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Decode a token's claims without verifying it
    Inspect {
        /// Token string
        token: String,
    },
    /// Generate an unsigned token for simulation
    Generate {
        /// Lifetime in seconds (negative for an already expired token)
        #[arg(short, long, default_value = "3600", allow_hyphen_values = true)]
        ttl: i64,
        /// Email claim
        #[arg(short, long)]
        email: Option<String>,
    },
}

/// Configuration arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate a configuration file
    Validate {
        /// Configuration file path
        file: PathBuf,
    },
    /// Create default project configuration
    Init {
        /// Project directory (defaults to the current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Show configuration file locations
    Path,
}

/// Simulation arguments
#[derive(ClapArgs, Debug)]
pub struct SimulateArgs {
    /// Token to sign in with; an unsigned one is generated when absent
    #[arg(short, long)]
    pub token: Option<String>,

    /// Lifetime of the generated token in seconds
    #[arg(long, default_value = "3600")]
    pub ttl: i64,

    /// Email of the signed-in user
    #[arg(short, long, default_value = "user@example.com")]
    pub email: String,

    /// Persisted store file (in-memory when absent)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Override the idle timeout in milliseconds
    #[arg(long)]
    pub idle_timeout_ms: Option<u64>,

    /// Override the idle warning in milliseconds
    #[arg(long)]
    pub idle_warning_ms: Option<u64>,

    /// Override the background timeout in milliseconds
    #[arg(long)]
    pub background_timeout_ms: Option<u64>,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
