//! # Caption Harness
//!
//! Incremental caption sync and transcript search for a single YouTube
//! channel.
//!
//! Caption Harness lists a channel's uploads through the YouTube Data API,
//! fetches each video's caption track, and keeps the transcripts in a
//! SQLite-backed keyed store. Finished years can be frozen into per-year
//! JSON archive files. Search scans both sources and returns every matching
//! caption segment with its surrounding context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌────────────────┐
//! │ YouTube API  │──▶│ Sync Engine │──▶│ SQLite kv      │
//! │ + watch page │   │  (core)     │   │ <year>.json    │
//! └──────────────┘   └─────────────┘   └───────┬────────┘
//!                                              │
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                 ┌──────────┐           ┌──────────┐
//!                 │   CLI    │           │   HTTP   │
//!                 │  (capt)  │           │  (axum)  │
//!                 └──────────┘           └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite keyed store |
//! | [`archive_fs`] | Per-year JSON archive directory |
//! | [`youtube`] | YouTube Data API client |
//! | [`captions`] | Caption track fetching and timed-text parsing |
//! | [`ingest`] | Sync orchestration |
//! | [`search`] | Transcript search |
//! | [`get`] | Record lookup |
//! | [`stats`] | Store and archive statistics |
//! | [`progress`] | Sync progress rendering |
//! | [`server`] | HTTP server |

pub mod archive_fs;
pub mod captions;
pub mod config;
pub mod db;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod youtube;
