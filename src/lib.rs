//! Depth snapshot archive library.
//!
//! This crate provides the core types and logic used by the `depth_archive`
//! recorder binary and the `bookat` query tool:
//!
//! - `record`: on-disk schema and length-prefixed frame codec
//! - `layout`: per-symbol, per-UTC-day file naming shared by both paths
//! - `store`: rotating append-only log writer
//! - `query`: nearest-at-or-before snapshot scan over one day's log
//! - `book`: materialization into sorted price ladders
//! - `feed`: Binance combined-stream message decoding
//! - `retry`: reconnect policy for the ingestion loop
//!
//! The write path (feed -> store -> day log) and the read path (target time
//! -> query -> book) share only the on-disk format and never run against the
//! same file with contention-sensitive semantics.
pub mod book;
pub mod feed;
pub mod layout;
pub mod query;
pub mod record;
pub mod retry;
pub mod store;
