use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::{ClientError, SessionConfig, SessionEvent, SessionHandle, spawn_session};
use frames::{ClientMessage, CursorPosition};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing {0}; pass --{1} or set {0}")]
    Missing(&'static str, &'static str),
    #[error("invalid hub URL: {0}")]
    InvalidUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error(transparent)]
    Session(#[from] ClientError),
    #[error("session closed")]
    SessionClosed,
    #[error("no snapshot received within {0:?}")]
    NoSnapshot(Duration),
    #[error("read {path} failed: {source}")]
    Input { path: String, source: io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "board-sync", about = "Realtime board hub CLI")]
struct Cli {
    #[arg(long, env = "BOARD_SYNC_URL", default_value = client::config::DEFAULT_URL)]
    url: String,

    #[arg(long, env = "BOARD_SYNC_BOARD")]
    board: Option<String>,

    #[arg(long, env = "BOARD_SYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, default_value_t = 5, help = "Seconds to wait for the join reply")]
    join_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the hub's health endpoint.
    Ping,
    /// Join a board and print every hub frame as one JSON line.
    Watch,
    /// Move the cursor once, then leave.
    Cursor { x: f64, y: f64 },
    /// Request the stored scene and print it.
    Sync {
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Send `element_added` for each JSON line of a file or stdin.
    Stream(StreamArgs),
}

#[derive(Args, Debug)]
struct StreamArgs {
    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,

    #[arg(long, help = "Stop after this many elements")]
    max_elements: Option<usize>,

    #[arg(long, default_value_t = 1000)]
    progress_every: usize,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Ping => run_ping(&cli.url).await,
        Command::Watch => run_watch(&cli).await,
        Command::Cursor { x, y } => run_cursor(&cli, CursorPosition { x: *x, y: *y }).await,
        Command::Sync { timeout_ms } => run_sync(&cli, Duration::from_millis(*timeout_ms)).await,
        Command::Stream(args) => run_stream(&cli, args).await,
    }
}

async fn run_ping(url: &str) -> Result<(), CliError> {
    let response = reqwest::get(health_url(url)?).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_watch(cli: &Cli) -> Result<(), CliError> {
    let (handle, mut events) = join(cli).await?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(SessionEvent::Message(msg)) => println!("{}", frames::encode(&msg).map_err(ClientError::from)?),
                Some(SessionEvent::Disconnected) => eprintln!("disconnected"),
                Some(SessionEvent::Reconnecting { attempt, delay }) => {
                    eprintln!("reconnecting (attempt {attempt}) in {delay:?}");
                }
                Some(SessionEvent::Offline) => return Err(ClientError::Offline.into()),
                Some(SessionEvent::Rejected { code, message }) => {
                    return Err(ClientError::Rejected { code, message }.into());
                }
                None => return Err(CliError::SessionClosed),
            },
        }
    }
    handle.disconnect().await;
    Ok(())
}

async fn run_cursor(cli: &Cli, position: CursorPosition) -> Result<(), CliError> {
    let (handle, _events) = join(cli).await?;
    handle.send(ClientMessage::CursorMove { position });
    handle.disconnect().await;
    eprintln!("cursor moved to ({}, {})", position.x, position.y);
    Ok(())
}

async fn run_sync(cli: &Cli, wait: Duration) -> Result<(), CliError> {
    let (handle, _events) = join(cli).await?;
    let scene = handle.request_sync(wait).await;
    handle.disconnect().await;

    let scene = scene.ok_or(CliError::NoSnapshot(wait))?;
    println!("{}", serde_json::to_string_pretty(&scene)?);
    Ok(())
}

async fn run_stream(cli: &Cli, args: &StreamArgs) -> Result<(), CliError> {
    let input_error = |source| CliError::Input { path: args.input.clone(), source };
    let mut reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input).map_err(input_error)?))
    };

    let (handle, _events) = join(cli).await?;
    let mut sent = 0_usize;
    let mut skipped = 0_usize;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(input_error)? == 0 {
            break;
        }
        let Some(message) = parse_element_line(&line)? else {
            skipped = skipped.saturating_add(1);
            continue;
        };
        if !handle.send(message) {
            return Err(CliError::SessionClosed);
        }

        sent = sent.saturating_add(1);
        if args.progress_every > 0 && sent.is_multiple_of(args.progress_every) {
            eprintln!("streamed {sent} elements...");
        }
        if args.max_elements.is_some_and(|limit| sent >= limit) {
            break;
        }
    }
    handle.disconnect().await;

    eprintln!("stream complete: sent={sent} skipped={skipped}");
    Ok(())
}

/// Start a session for `--board`/`--token` and wait for the join reply.
async fn join(cli: &Cli) -> Result<(SessionHandle, mpsc::Receiver<SessionEvent>), CliError> {
    let board = cli.board.clone().ok_or(CliError::Missing("BOARD_SYNC_BOARD", "board"))?;
    let token = cli.token.clone().ok_or(CliError::Missing("BOARD_SYNC_TOKEN", "token"))?;
    let mut config = SessionConfig::from_env(board, token)?;
    config.url.clone_from(&cli.url);

    let (handle, events) = spawn_session(config);
    let connection_id = handle.wait_joined(Duration::from_secs(cli.join_timeout)).await?;
    eprintln!("joined as {connection_id}");
    Ok((handle, events))
}

/// `ws://host/api/ws` -> `http://host/healthz`.
fn health_url(url: &str) -> Result<String, CliError> {
    let (scheme, rest) = if let Some(rest) = url.strip_prefix("ws://") {
        ("http", rest)
    } else if let Some(rest) = url.strip_prefix("wss://") {
        ("https", rest)
    } else {
        return Err(CliError::InvalidUrl(url.to_owned()));
    };
    let host = rest.split('/').next().filter(|h| !h.is_empty()).ok_or_else(|| CliError::InvalidUrl(url.to_owned()))?;
    Ok(format!("{scheme}://{host}/healthz"))
}

/// One JSON object per line. `id` becomes the element id (a fresh one if
/// missing); the rest is the element payload. Blank and non-object lines
/// are skipped.
fn parse_element_line(line: &str) -> Result<Option<ClientMessage>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let mut value = serde_json::from_str::<Value>(trimmed)?;
    let Some(map) = value.as_object_mut() else {
        return Ok(None);
    };
    let element_id = match map.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };
    Ok(Some(ClientMessage::ElementAdded { element_id, element_data: value }))
}
