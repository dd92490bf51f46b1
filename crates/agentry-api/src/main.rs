//! Agentry CLI and HTTP API entry point.
//!
//! Binary name: `agentry`
//!
//! Parses CLI arguments, loads configuration, wires the application state
//! and then either serves the HTTP API or runs a maintenance command.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use agentry_infra::config::{default_config_path, load_config};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    agentry_observe::tracing_setup::init_tracing(cli.verbose, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    agentry_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "agentry", &mut std::io::stdout());
            return Ok(());
        }
        Commands::GenerateKey => {
            cli::keys::generate_key(cli.json);
            return Ok(());
        }
        _ => {}
    }

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(&config_path).await;
    let state = AppState::init(config).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let router = http::router::build_router(state);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "agentry API listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::RotateKeys { dry_run } => {
            cli::keys::rotate_keys(&state, dry_run, cli.json).await?;
        }
        Commands::CreateApiKey { account_id, name } => {
            cli::keys::create_api_key(&state, account_id, &name, cli.json).await?;
        }
        Commands::GenerateKey | Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
