use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use meridian_core::bootstrap::AppBuilder;
use meridian_core::{Orchestrator, TurnOutcome};
use meridian_gateway::GatewayServer;
use meridian_llm::AnyProvider;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

mod cli;

use cli::{Cli, Command};

const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let app = AppBuilder::from_cli(cli.config.as_deref())?;
    let orchestrator = app.build().await?;

    match cli.command {
        Command::Serve => serve(&app, orchestrator).await,
        Command::Index { file, force } => {
            index_file(&app, &orchestrator, &file, force).await?;
            Ok(())
        }
        Command::Ask { question } => {
            let turn = orchestrator.handle(&question.join(" ")).await;
            print_turn(&turn);
            Ok(())
        }
        Command::Chat { document } => {
            if let Some(path) = document {
                index_file(&app, &orchestrator, &path, false).await?;
            }
            chat(&orchestrator).await
        }
    }
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(app: &AppBuilder, orchestrator: Orchestrator<AnyProvider>) -> anyhow::Result<()> {
    let config = app.config();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let token = config
        .secrets
        .gateway_token
        .as_ref()
        .map(|s| s.expose().to_owned());

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        Arc::new(orchestrator),
        shutdown_rx,
    )
    .with_auth(token)
    .with_rate_limit(config.gateway.rate_limit)
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await
    .context("gateway failed")
}

async fn index_file(
    app: &AppBuilder,
    orchestrator: &Orchestrator<AnyProvider>,
    path: &Path,
    force: bool,
) -> anyhow::Result<()> {
    let (bytes, name) = meridian_index::document::read_file(path, app.config().index.max_file_size)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let outcome = orchestrator
        .upload(bytes, &name, force)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let verb = if outcome.cached { "reused" } else { "indexed" };
    println!(
        "{verb} {} ({} chunks)",
        outcome.index.source, outcome.index.chunk_count
    );
    Ok(())
}

async fn chat(orchestrator: &Orchestrator<AnyProvider>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match orchestrator.active_document() {
        Some(index) => println!("Document loaded: {}", index.source),
        None => println!("No document loaded. Run `meridian index <file>` to add one."),
    }
    println!("Type a question, or `exit` to quit.");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&query) {
            break;
        }

        let turn = orchestrator.handle(query).await;
        print_turn(&turn);
    }
    Ok(())
}

fn print_turn(turn: &TurnOutcome) {
    tracing::debug!(branch = %turn.branch, steps = ?turn.steps, "turn finished");
    println!("{}", turn.answer);
}
