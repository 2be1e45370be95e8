use std::{
    io::{self, BufRead, BufReader},
    thread,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use client_core::{
    config::{load_settings, normalize_ws_url},
    reconciler::ViewState,
    transcript::TranscriptEntry,
    AssistantHandle, ClientEvent, MapAssistantSession,
};
use shared::domain::ConnectionState;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Chat with the map assistant and follow the shared map view")]
struct Args {
    /// Overrides `MAP_ASSISTANT_WS_URL` / `map_assistant.toml`.
    #[arg(long)]
    ws_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(ws_url) = args.ws_url {
        settings.ws_url = normalize_ws_url(&ws_url);
    }

    let (session, mut events) = MapAssistantSession::start(&settings.ws_url)
        .with_context(|| format!("failed to start session against {}", settings.ws_url))?;
    let client = session.client();

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ClientEvent::TranscriptAppended(entry)) => print_entry(&entry),
                Ok(ClientEvent::ViewUpdated(view)) => print_view_summary(&view),
                Ok(ClientEvent::ConnectionChanged(state)) => {
                    tracing::debug!(?state, "console: connection state changed")
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "console: output fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = spawn_line_reader(BufReader::new(io::stdin()));
    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                let line = line.context("failed to read stdin")?;
                handle_line(&*client, &line).await?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown().await;
    drop(client);
    let _ = printer.await;
    Ok(())
}

/// Reads lines on a plain thread. A blocked read cannot be cancelled, so the
/// thread is left behind on exit instead of being joined.
fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

async fn handle_line(client: &dyn AssistantHandle, line: &str) -> Result<()> {
    if line.trim() == "/state" {
        let view = client.view_state().await;
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    if !client.submit_user_input(line).await && !line.trim().is_empty() {
        let state = client.connection_state();
        if state != ConnectionState::Connected {
            eprintln!("(not sent: {state:?})");
        }
    }
    Ok(())
}

fn print_entry(entry: &TranscriptEntry) {
    let time = entry.timestamp.with_timezone(&Local).format("%H:%M:%S");
    println!("[{time}] {}: {}", entry.origin.as_str(), entry.content);
}

fn print_view_summary(view: &ViewState) {
    let boundary = match &view.boundary {
        Some(boundary) => format!("boundary#{}", boundary.epoch),
        None => "no boundary".to_string(),
    };
    println!(
        "  map: center=({:.4}, {:.4}) zoom={} markers={} {}",
        view.center.lat,
        view.center.lng,
        view.zoom,
        view.markers.len(),
        boundary
    );
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
