use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use depth_archive::feed;
use depth_archive::layout;
use depth_archive::retry::RetryPolicy;
use depth_archive::store::SnapshotStore;
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tungstenite::Message;

#[derive(Debug, Parser)]
#[command(version, about = "Depth snapshot recorder (Binance combined stream)")]
struct Args {
    /// Symbols to record, comma-separated
    #[arg(
        long,
        env = "SYMBOLS",
        value_delimiter = ',',
        default_value = "ethusdt,ethusdc,ethbtc"
    )]
    symbols: Vec<String>,

    /// Root directory for the day logs
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Combined stream endpoint prefix
    #[arg(
        long,
        env = "WS_URL",
        default_value = "wss://stream.binance.com:9443/stream?streams="
    )]
    ws_url: String,

    /// Per-symbol stream suffix (top 20 levels, 100ms cadence)
    #[arg(long, env = "STREAM_SUFFIX", default_value = "@depth20@100ms")]
    stream_suffix: String,

    /// Seconds to wait between reconnect attempts
    #[arg(long, env = "RECONNECT_SECS", default_value_t = 5)]
    reconnect_secs: u64,

    /// Give up after this many sessions; omit to retry forever
    #[arg(long, env = "MAX_SESSIONS")]
    max_sessions: Option<u32>,
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let store = Arc::new(SnapshotStore::new(&args.data_dir));

    // Graceful shutdown: flush every open day log, then exit
    let store_for_shutdown = Arc::clone(&store);
    ctrlc::set_handler(move || {
        if let Err(e) = store_for_shutdown.flush_all() {
            error!(error = %e, "flush on shutdown failed");
        }
        std::process::exit(0);
    })
    .ok();

    let delay = Duration::from_secs(args.reconnect_secs);
    let policy = match args.max_sessions {
        Some(n) => RetryPolicy::bounded(delay, n),
        None => RetryPolicy::unbounded(delay),
    };
    let url = feed::combined_stream_url(&args.ws_url, &args.symbols, &args.stream_suffix);

    let mut sessions = 0u32;
    loop {
        match run_session(&url, &store) {
            Ok(()) => info!("session closed by server"),
            Err(e) => warn!(error = %e, "session ended"),
        }
        sessions += 1;
        let Some(delay) = policy.next_delay(sessions) else {
            error!(sessions, "session budget exhausted, giving up");
            break;
        };
        info!(delay_secs = delay.as_secs(), "reconnecting");
        std::thread::sleep(delay);
    }

    store.flush_all()
}

/// One connection's read-decode-append loop. Returns when the connection
/// drops or the server closes; the caller decides whether to re-dial.
fn run_session(url: &str, store: &SnapshotStore) -> Result<()> {
    let (mut socket, _response) = tungstenite::connect(url).context("websocket dial")?;
    info!(url, "connected to combined stream");

    loop {
        match socket.read().context("websocket read")? {
            Message::Text(text) => {
                let (symbol, depth) = match feed::decode_message(text.as_str()) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        warn!(error = %e, "undecodable stream message, skipping");
                        continue;
                    }
                };
                let snapshot = depth.into_snapshot(layout::now_unix_millis());
                if let Err(e) = store.append(&symbol, &snapshot) {
                    // This snapshot is dropped; the next append retries the
                    // directory/file open from scratch.
                    warn!(symbol, error = %e, "append failed, snapshot dropped");
                }
            }
            Message::Ping(payload) => {
                socket.send(Message::Pong(payload)).context("send pong")?;
            }
            Message::Close(frame) => {
                info!(?frame, "server closed connection");
                return Ok(());
            }
            _ => {}
        }
    }
}
