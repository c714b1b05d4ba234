//! Rotating per-symbol, per-UTC-day append-only log writer.
//!
//! The store keeps one open file per symbol, chosen by the UTC calendar date
//! at the moment of each append. Rotation is decided per append, never by a
//! timer: a symbol idle across midnight rotates lazily on its next write.
//! Old files are only ever flushed and dropped, never rewritten.
//!
//! Each symbol's handle sits behind its own lock inside a shared registry,
//! so concurrent appends to different symbols do not contend.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::layout;
use crate::record::{self, Snapshot};

struct OpenLog {
    date: Date,
    writer: BufWriter<File>,
}

#[derive(Default)]
struct SymbolLog {
    open: Option<OpenLog>,
}

/// Append-only snapshot log store rooted at a data directory.
pub struct SnapshotStore {
    root: PathBuf,
    logs: Mutex<HashMap<String, Arc<Mutex<SymbolLog>>>>,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            logs: Mutex::new(HashMap::new()),
        }
    }

    /// Append one snapshot under the symbol's file for the current UTC date.
    ///
    /// On success the frame has been handed to the OS (flushed through the
    /// buffer); no sync-to-device is performed.
    pub fn append(&self, symbol: &str, snapshot: &Snapshot) -> Result<()> {
        self.append_on(symbol, snapshot, OffsetDateTime::now_utc().date())
    }

    /// Append under an explicit "today". Exists so rotation is testable
    /// without clock control; [`append`](Self::append) passes `now_utc`.
    pub fn append_on(&self, symbol: &str, snapshot: &Snapshot, today: Date) -> Result<()> {
        let entry = self.entry(symbol)?;
        let mut log = entry
            .lock()
            .map_err(|_| anyhow!("symbol log lock poisoned: {symbol}"))?;

        let stale = !matches!(&log.open, Some(o) if o.date == today);
        if stale {
            if let Some(mut old) = log.open.take() {
                if let Err(e) = old.writer.flush() {
                    warn!(symbol, error = %e, "flush of rotated-out log failed");
                }
            }
            let path = layout::log_path(&self.root, symbol, today);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            info!(symbol, path = %path.display(), "opened day log");
            log.open = Some(OpenLog {
                date: today,
                writer: BufWriter::new(file),
            });
        }

        let open = log
            .open
            .as_mut()
            .ok_or_else(|| anyhow!("no open log for {symbol}"))?;
        let frame = record::encode_frame(snapshot)?;
        open.writer.write_all(&frame).context("write frame")?;
        open.writer.flush().context("flush frame")?;
        Ok(())
    }

    /// Flush every open log. Used on shutdown; failures are logged, not fatal.
    pub fn flush_all(&self) -> Result<()> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| anyhow!("log registry lock poisoned"))?;
        for (symbol, entry) in logs.iter() {
            let Ok(mut log) = entry.lock() else {
                warn!(symbol, "skipping poisoned symbol log");
                continue;
            };
            if let Some(open) = log.open.as_mut() {
                if let Err(e) = open.writer.flush() {
                    warn!(symbol, error = %e, "flush failed");
                }
            }
        }
        Ok(())
    }

    fn entry(&self, symbol: &str) -> Result<Arc<Mutex<SymbolLog>>> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| anyhow!("log registry lock poisoned"))?;
        Ok(logs.entry(symbol.to_lowercase()).or_default().clone())
    }
}
