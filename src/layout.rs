//! Path and calendar conventions shared by the writer and the reader.
//!
//! A log file is identified by `(symbol, UTC calendar date)` and lives at
//! `<root>/<symbol-lowercase>/<symbol-lowercase>_<YYYY-MM-DD>.bin`. Both the
//! recorder and the query tool derive paths through these functions only, so
//! the two sides agree by construction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::{Date, OffsetDateTime};

/// UTC calendar date containing the given epoch-millisecond instant.
pub fn utc_date_for_millis(millis: i64) -> Result<Date> {
    let odt = OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .with_context(|| format!("timestamp out of range: {millis}"))?;
    Ok(odt.date())
}

pub fn format_utc_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Log file path for a symbol and UTC date. Pure function of its inputs.
pub fn log_path(root: &Path, symbol: &str, date: Date) -> PathBuf {
    let sym = symbol.to_lowercase();
    let file = format!("{}_{}.bin", sym, format_utc_date(date));
    root.join(sym).join(file)
}

/// Current UTC time in epoch milliseconds.
pub fn now_unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
