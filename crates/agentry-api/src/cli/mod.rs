//! CLI command definitions for the `agentry` binary.

pub mod keys;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run and operate the Agentry agent orchestration service.
#[derive(Parser)]
#[command(name = "agentry", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to agentry.toml (defaults to ./agentry.toml, then the user config dir).
    #[arg(long, global = true, env = "AGENTRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, short, default_value_t = 8080)]
        port: u16,
    },

    /// Re-encrypt every stored credential under the current primary key.
    RotateKeys {
        /// Check that every credential decrypts without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Issue an API key for an account. The key is printed once.
    CreateApiKey {
        #[arg(long)]
        account_id: i64,

        #[arg(long, default_value = "default")]
        name: String,
    },

    /// Generate a fresh base64 vault key for CREDENTIALS_ENCRYPTION_KEY.
    GenerateKey,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
