use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ConnectionManager, DashboardSession, HttpDashboardApi};
use shared::domain::Period;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod config;
mod console;

use config::load_settings;
use console::{parse_operator_command, render_events, set_toggle, ConsoleCommand, SharedToggle};

#[derive(Parser, Debug)]
struct Args {
    /// Dashboard server, e.g. http://localhost:5000
    #[arg(long)]
    server_url: Option<String>,
    /// TOML settings file (defaults to ./dashboard.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// History period loaded at startup
    #[arg(long)]
    period: Option<Period>,
    /// Mode toggle echo suppression window in milliseconds
    #[arg(long)]
    suppression_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(period) = args.period {
        settings.period = period;
    }
    if let Some(ms) = args.suppression_ms {
        settings.suppression_ms = ms;
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let connection = Arc::new(ConnectionManager::new(&settings.server_url)?);
    let api = Arc::new(HttpDashboardApi::new(&settings.server_url)?);
    let mut session = DashboardSession::new(
        api,
        connection.clone(),
        settings.suppression_window(),
    );
    session.attach(&connection);
    let handle = session.handle();

    let widget = SharedToggle::default();
    let renderer = tokio::spawn(render_events(
        handle.subscribe_events(),
        Arc::clone(&widget),
        handle.clone(),
    ));

    info!(server_url = %settings.server_url, ws_url = connection.ws_url(), "dashboard: starting");
    if let Err(err) = connection.connect().await {
        warn!("push: {err:#}; live updates unavailable until reconnect");
    }
    session.start(settings.period);
    let running = tokio::spawn(session.run());

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read operator input")?
    {
        match parse_operator_command(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Toggle { checked })) => {
                if let Some(action) = set_toggle(&widget, checked) {
                    handle.send(action);
                }
            }
            Ok(Some(ConsoleCommand::Action(action))) => handle.send(action),
            Ok(Some(ConsoleCommand::Reconnect)) => {
                if let Err(err) = connection.connect().await {
                    warn!("push: {err:#}");
                }
            }
            Ok(Some(ConsoleCommand::Help)) => {
                let checked = widget.lock().map(|w| w.checked()).unwrap_or(true);
                let position = if checked { "auto" } else { "manual" };
                println!("{}\nmode toggle: {position}", console::HELP);
            }
            Ok(Some(ConsoleCommand::Quit)) => break,
            Err(err) => println!("{err}"),
        }
    }

    handle.shutdown();
    running.await.context("session task failed")?;
    connection.disconnect();
    renderer.abort();
    Ok(())
}
