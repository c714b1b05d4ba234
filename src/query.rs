//! Nearest-at-or-before snapshot lookup over one day's log.
//!
//! A single forward scan, no index: frames are decoded in file order, each
//! one at or before the target replaces the running candidate, and the first
//! frame past the target ends the scan. O(frames scanned), which is the
//! deliberate trade for an append-only file produced sequentially.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::layout;
use crate::record::{FrameRead, Snapshot, read_frame};

/// Most recent snapshot for `symbol` whose event time is at or before
/// `target_ms`, or `None` if that day's file is absent or holds no
/// qualifying frame.
///
/// The file is resolved purely from the symbol and the UTC date of the
/// target; adjacent days are never consulted, so a target just after
/// midnight sees only what that day's file holds. The scan assumes frames
/// were appended in non-decreasing event-time order; out-of-order input
/// would make the early stop return a stale answer. That ordering is not
/// verified here, it is a documented limitation of the format.
///
/// Malformed frame payloads are skipped (the stream is still frame-aligned
/// after them). Lost framing, including a torn trailing frame written by a
/// live recorder, ends the scan with whatever candidate was found.
pub fn snapshot_at(root: &Path, symbol: &str, target_ms: i64) -> Result<Option<Snapshot>> {
    let date = layout::utc_date_for_millis(target_ms)?;
    let path = layout::log_path(root, symbol, date);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(symbol, path = %path.display(), "no log for target day");
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
    };

    let mut r = BufReader::new(file);
    let mut candidate: Option<Snapshot> = None;
    let mut frames = 0usize;
    loop {
        match read_frame(&mut r).with_context(|| format!("read {}", path.display()))? {
            FrameRead::Frame(s) => {
                frames += 1;
                if s.event_time_ms > target_ms {
                    break;
                }
                candidate = Some(s);
            }
            FrameRead::Malformed => {
                frames += 1;
                warn!(symbol, frame = frames, "skipping malformed frame");
            }
            FrameRead::Truncated => {
                // Mid-file corruption or a torn tail from a live writer;
                // either way the remainder of the file is unreadable.
                warn!(symbol, frames, "framing lost, stopping scan");
                break;
            }
            FrameRead::Eof => break,
        }
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, encode_frame};
    use std::fs;
    use std::io::Write;
    use time::macros::datetime;

    // 2025-08-17T00:00:00Z, so offsets below stay within one UTC day.
    fn base_ms() -> i64 {
        datetime!(2025-08-17 00:00 UTC).unix_timestamp() * 1000
    }

    fn snap(event_time_ms: i64) -> Snapshot {
        Snapshot {
            event_time_ms,
            last_update_id: event_time_ms,
            bids: vec![Level { price: 10.0, quantity: 1.0 }],
            asks: vec![Level { price: 11.0, quantity: 1.0 }],
        }
    }

    fn write_log(root: &Path, symbol: &str, chunks: &[Vec<u8>]) {
        let date = layout::utc_date_for_millis(base_ms()).unwrap();
        let path = layout::log_path(root, symbol, date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(&path).unwrap();
        for chunk in chunks {
            f.write_all(chunk).unwrap();
        }
    }

    fn frames_at(offsets: &[i64]) -> Vec<Vec<u8>> {
        offsets
            .iter()
            .map(|off| encode_frame(&snap(base_ms() + off)).unwrap())
            .collect()
    }

    #[test]
    fn nearest_at_or_before_semantics() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "ethusdt", &frames_at(&[100, 200, 300]));
        let found = |target_off: i64| {
            snapshot_at(dir.path(), "ethusdt", base_ms() + target_off)
                .unwrap()
                .map(|s| s.event_time_ms - base_ms())
        };

        assert_eq!(found(250), Some(200));
        assert_eq!(found(50), None);
        assert_eq!(found(300), Some(300));
        assert_eq!(found(1000), Some(300));
    }

    #[test]
    fn absent_day_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(snapshot_at(dir.path(), "ethusdt", base_ms()).unwrap().is_none());
    }

    #[test]
    fn malformed_frame_mid_file_does_not_hide_later_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut garbage = 6u32.to_le_bytes().to_vec();
        garbage.extend_from_slice(&[0xff; 6]);
        let chunks = vec![
            encode_frame(&snap(base_ms() + 100)).unwrap(),
            garbage,
            encode_frame(&snap(base_ms() + 300)).unwrap(),
        ];
        write_log(dir.path(), "ethusdt", &chunks);

        let s = snapshot_at(dir.path(), "ethusdt", base_ms() + 1000)
            .unwrap()
            .unwrap();
        assert_eq!(s.event_time_ms, base_ms() + 300);
    }

    #[test]
    fn corrupt_length_prefix_returns_best_candidate_so_far() {
        let dir = tempfile::tempdir().unwrap();
        // Prefix claims far more bytes than follow, so frames past it are
        // unreachable even though one of them would match better.
        let mut torn = 10_000u32.to_le_bytes().to_vec();
        torn.extend_from_slice(&[0xab; 8]);
        let chunks = vec![
            encode_frame(&snap(base_ms() + 100)).unwrap(),
            torn,
            encode_frame(&snap(base_ms() + 200)).unwrap(),
        ];
        write_log(dir.path(), "ethusdt", &chunks);

        let s = snapshot_at(dir.path(), "ethusdt", base_ms() + 1000)
            .unwrap()
            .unwrap();
        assert_eq!(s.event_time_ms, base_ms() + 100);
    }

    #[test]
    fn torn_trailing_frame_acts_as_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let whole = encode_frame(&snap(base_ms() + 100)).unwrap();
        let partial = encode_frame(&snap(base_ms() + 200)).unwrap();
        let cut = partial.len() - 3;
        let chunks = vec![whole, partial[..cut].to_vec()];
        write_log(dir.path(), "ethusdt", &chunks);

        let s = snapshot_at(dir.path(), "ethusdt", base_ms() + 1000)
            .unwrap()
            .unwrap();
        assert_eq!(s.event_time_ms, base_ms() + 100);
    }

    #[test]
    fn scan_stops_at_first_frame_past_target() {
        // Frames after the stop point are never decoded, so even corruption
        // there is irrelevant to the answer.
        let dir = tempfile::tempdir().unwrap();
        let chunks = vec![
            encode_frame(&snap(base_ms() + 100)).unwrap(),
            encode_frame(&snap(base_ms() + 500)).unwrap(),
            vec![0xff; 32],
        ];
        write_log(dir.path(), "ethusdt", &chunks);

        let s = snapshot_at(dir.path(), "ethusdt", base_ms() + 200)
            .unwrap()
            .unwrap();
        assert_eq!(s.event_time_ms, base_ms() + 100);
    }
}
