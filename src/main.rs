mod cli;

use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use ractor::ActorRef;
use repo_likes::actors::repository_list::{self, RepositoryListMessage};
use repo_likes::actors::RepositoryListActor;
use repo_likes::api::{ApiClient, ClientConfig};
use repo_likes::error::{RepoLikesError, Result};
use repo_likes::render::{render_failure, render_list, RenderOptions};
use repo_likes::server::{self, BackendState};
use repo_likes::types::RepositoryId;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    // stdout is the rendering surface, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let options = RenderOptions {
        color: !cli.no_color,
        show_test_ids: cli.show_ids,
    };
    let request_timeout = Duration::from_secs(cli.timeout_secs);
    // Actor calls wait for the HTTP timeout plus some slack
    let call_timeout = request_timeout + Duration::from_secs(5);

    match cli.command {
        Command::Serve { port, seed } => run_server(port, seed).await,
        command => {
            let config = ClientConfig::from_url(&cli.api_url)?.with_timeout(request_timeout);
            let client = ApiClient::new(config)?;
            info!("Using repositories API at {}", client.base_url());

            let actor = RepositoryListActor::spawn_with_api(Arc::new(client)).await
                .map_err(|e| RepoLikesError::ActorError(format!("Failed to start list actor: {}", e)))?;

            let result = match command {
                Command::List => run_list(&actor, &options, call_timeout).await,
                Command::Like { ids } => run_like(&actor, ids, &options, call_timeout).await,
                Command::Watch => run_watch(&actor, &options, call_timeout).await,
                Command::Serve { .. } => Ok(()),
            };

            actor.stop(None);
            result
        }
    }
}

async fn run_list(
    actor: &ActorRef<RepositoryListMessage>,
    options: &RenderOptions,
    timeout: Duration
) -> Result<()> {
    repository_list::refresh(actor, timeout).await?;
    let snapshot = repository_list::snapshot(actor, timeout).await?;
    print!("{}", render_list(&snapshot.records, options));
    Ok(())
}

async fn run_like(
    actor: &ActorRef<RepositoryListMessage>,
    ids: Vec<String>,
    options: &RenderOptions,
    timeout: Duration
) -> Result<()> {
    repository_list::refresh(actor, timeout).await?;

    let ids = ids.iter().map(|id| RepositoryId::parse_cli(id)).collect();
    let report = repository_list::like_all(actor, ids, timeout).await?;

    for failure in &report.failures {
        eprintln!("{}", render_failure(failure, options.color));
    }
    print!("{}", render_list(&report.snapshot.records, options));

    report.ensure_all_liked()
}

async fn run_watch(
    actor: &ActorRef<RepositoryListMessage>,
    options: &RenderOptions,
    timeout: Duration
) -> Result<()> {
    repository_list::refresh(actor, timeout).await?;

    let mut receiver = repository_list::subscribe(actor, timeout).await?;
    let render_options = options.clone();
    let renderer = tokio::spawn(async move {
        loop {
            {
                let snapshot = receiver.borrow_and_update();
                println!("{}", format!("── version {} ──", snapshot.version).dimmed());
                print!("{}", render_list(&snapshot.records, &render_options));
            }
            if receiver.changed().await.is_err() {
                break;
            }
        }
    });

    println!("{}", "Type a repository id and press Enter to like it (q to quit)".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "q" || input == "quit" {
                    break;
                }

                let actor = actor.clone();
                let id = RepositoryId::parse_cli(input);
                let color = options.color;
                tokio::spawn(async move {
                    match repository_list::like(&actor, id, timeout).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(failure)) => eprintln!("{}", render_failure(&failure, color)),
                        Err(e) => error!("Like request failed: {}", e),
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    if let Ok(stats) = repository_list::stats(actor, timeout).await {
        info!(
            "Likes applied: {}, failed: {}, list version: {}",
            stats.likes_applied,
            stats.likes_failed,
            stats.version
        );
    }
    renderer.abort();
    Ok(())
}

async fn run_server(port: u16, seed: Option<std::path::PathBuf>) -> Result<()> {
    let state = match seed {
        Some(path) => BackendState::from_seed_file(&path).await?,
        None => BackendState::default(),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    println!("{}", "Repo Likes development backend".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());
    println!("Press Ctrl+C to stop the server\n");

    tokio::select! {
        result = server::serve(listener, state) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n🛑 Shutting down server...");
            Ok(())
        }
    }
}
