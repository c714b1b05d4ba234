use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use depth_archive::book::{self, BookView};
use depth_archive::query;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about = "Render the recorded order book as of a point in time")]
struct Args {
    /// Symbol to query (case-insensitive)
    #[arg(long, short = 's')]
    symbol: String,

    /// Target instant, RFC 3339 (e.g. 2025-08-17T05:13:06Z)
    #[arg(long, conflicts_with = "at_ms")]
    at: Option<String>,

    /// Target instant, UTC epoch milliseconds
    #[arg(long)]
    at_ms: Option<i64>,

    /// Levels to print per side
    #[arg(long, default_value_t = 20)]
    depth: usize,

    /// Root directory holding the day logs
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
}

fn target_millis(args: &Args) -> Result<i64> {
    if let Some(ms) = args.at_ms {
        return Ok(ms);
    }
    let Some(at) = args.at.as_deref() else {
        bail!("one of --at or --at-ms is required");
    };
    let odt = OffsetDateTime::parse(at, &Rfc3339)
        .with_context(|| format!("parse target time {at:?}"))?;
    Ok((odt.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let target_ms = target_millis(&args)?;

    match query::snapshot_at(&args.data_dir, &args.symbol, target_ms)? {
        Some(snapshot) => {
            info!(
                event_time_ms = snapshot.event_time_ms,
                lag_ms = target_ms - snapshot.event_time_ms,
                last_update_id = snapshot.last_update_id,
                "found snapshot"
            );
            let view = BookView::from_snapshot(&snapshot);
            print!("{}", book::render(&view.ladder(args.depth)));
        }
        None => {
            // Explicit empty result, not an error: the day file may simply
            // not reach back to the target.
            println!(
                "no snapshot at or before {} for {}",
                target_ms, args.symbol
            );
            std::process::exit(1);
        }
    }
    Ok(())
}
