//! On-disk snapshot schema and frame codec.
//!
//! A log file is a plain concatenation of frames. Each frame is a 4-byte
//! little-endian length prefix followed by exactly that many bytes of
//! bincode-serialized [`Snapshot`]. There is no resynchronization marker:
//! once the length prefix stops lining up with the bytes that remain, the
//! rest of the stream is unreadable.

use std::io::{self, Read};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Frames longer than this are assumed to be a desynchronized length prefix
/// rather than real data; a 20-level snapshot is well under a kilobyte.
const MAX_FRAME_LEN: usize = 1 << 24;

/// One resting price/quantity pair on a side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub quantity: f64,
}

/// One full depth sample. Level order within a side is arrival order as
/// delivered by the feed, not necessarily price-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Local receipt time, UTC milliseconds (the feed carries no timestamp).
    pub event_time_ms: i64,
    /// Feed-assigned update sequence id.
    pub last_update_id: i64,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Outcome of pulling one frame off a byte stream.
#[derive(Debug)]
pub enum FrameRead {
    Frame(Snapshot),
    /// Clean end of stream at a frame boundary.
    Eof,
    /// Payload bytes were all present but did not parse. The stream is still
    /// frame-aligned, so the caller may keep scanning.
    Malformed,
    /// The length prefix is incomplete or claims more bytes than remain.
    /// Framing is lost for the rest of the stream.
    Truncated,
}

/// Serialize a snapshot into a length-prefixed frame.
pub fn encode_frame(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let payload = bincode::serialize(snapshot)?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Read the next frame. Only genuine I/O failures surface as `Err`; all
/// end-of-data and corruption conditions are reported through [`FrameRead`].
pub fn read_frame<R: Read>(r: &mut R) -> io::Result<FrameRead> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0usize;
    // Filled incrementally so a clean EOF at the frame boundary is
    // distinguishable from a prefix cut off mid-word.
    while filled < len_buf.len() {
        match r.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(FrameRead::Eof),
            Ok(0) => return Ok(FrameRead::Truncated),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Ok(FrameRead::Truncated);
    }
    let mut payload = vec![0u8; len];
    match r.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(FrameRead::Truncated),
        Err(e) => return Err(e),
    }

    match bincode::deserialize::<Snapshot>(&payload) {
        Ok(s) => Ok(FrameRead::Frame(s)),
        Err(_) => Ok(FrameRead::Malformed),
    }
}
