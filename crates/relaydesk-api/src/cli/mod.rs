//! CLI command definitions for the `relaydesk` binary.
//!
//! `relaydesk run` starts the relay; `clients` and `history` inspect the
//! conversation store offline.

pub mod inspect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Relay private chat messages between clients and one administrator.
#[derive(Parser)]
#[command(name = "relaydesk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also append logs to this file.
    #[arg(long, global = true, env = "RELAYDESK_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// SQLite database path (defaults to `<data dir>/relaydesk.db`).
    #[arg(long, global = true, env = "RELAYDESK_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay (long polling until Ctrl+C).
    Run {
        /// Bot API token.
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        token: String,

        /// Chat id of the administrator.
        #[arg(long, env = "ADMIN_CHAT_ID", allow_hyphen_values = true)]
        admin_chat_id: i64,
    },

    /// List known clients, most recent contact first.
    #[command(alias = "ls")]
    Clients,

    /// Show the conversation history with one client.
    History {
        /// Client id (the client's chat id).
        client_id: i64,

        /// Number of most recent messages to show.
        #[arg(short, long, default_value = "20")]
        count: u32,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
