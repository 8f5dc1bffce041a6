//! Relaydesk entry point.
//!
//! Binary name: `relaydesk`
//!
//! Parses CLI arguments, initializes tracing, the database and the relay
//! engine, then either runs the long-poll relay or an offline inspection
//! command.

mod cli;
mod poller;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use relaydesk_infra::telegram::TelegramClient;
use relaydesk_observe::tracing_setup::{TracingOptions, default_filter, init_tracing, shutdown_tracing};
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use poller::Dispatcher;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "relaydesk", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&TracingOptions {
        default_filter: default_filter(cli.verbose, cli.quiet).to_string(),
        json: cli.log_json,
        otel: cli.otel,
        log_file: cli.log_file.clone(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.database.as_deref()).await?;

    match cli.command {
        Commands::Run {
            token,
            admin_chat_id,
        } => run_relay(state, &token, admin_chat_id, cli.quiet).await?,

        Commands::Clients => cli::inspect::list_clients(&state, cli.json).await?,

        Commands::History { client_id, count } => {
            cli::inspect::show_history(&state, client_id, count, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn run_relay(state: AppState, token: &str, admin_chat_id: i64, quiet: bool) -> anyhow::Result<()> {
    let telegram = TelegramClient::new(token);

    let me = telegram.get_me().await.context("verifying bot token")?;
    telegram
        .delete_webhook()
        .await
        .context("removing webhook before long polling")?;

    tracing::info!(
        bot_id = me.id,
        bot = me.username.as_deref().unwrap_or_default(),
        admin_chat_id,
        data_dir = %state.data_dir.display(),
        database = %state.database_path.display(),
        "relay starting"
    );

    if !quiet {
        println!();
        println!(
            "  {} Relaying for {} (admin chat {})",
            console::style("⚡").bold(),
            console::style(me.display_name()).cyan(),
            console::style(admin_chat_id).yellow()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
        println!();
    }

    let engine = Arc::new(state.relay_engine(telegram.clone(), admin_chat_id));
    let dispatcher = Dispatcher::new(engine, state.config.greeting.clone());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("shutdown requested");
            cancel.cancel();
        }
    });

    dispatcher
        .run(&telegram, state.config.poll_timeout_secs, cancel)
        .await
        .context("relay stopped on a storage failure")?;

    if !quiet {
        println!("\n  Relay stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
