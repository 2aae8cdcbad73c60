//! # Caption Harness Core
//!
//! Storage-agnostic logic for Caption Harness: data models, the incremental
//! caption sync engine, the year-partitioned snapshot target, and the
//! transcript search aggregator.
//!
//! Every outside collaborator is a trait injected by the caller:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`platform::VideoPlatform`] | channel lookup and upload listing |
//! | [`platform::CaptionFetcher`] | per-video caption tracks |
//! | [`store::KeyValueStore`] | live keyed store |
//! | [`archive::Archive`] | per-year archival partitions |
//!
//! This crate contains no HTTP client, sqlx, or filesystem I/O. The
//! application crate supplies those backends.

pub mod archive;
pub mod error;
pub mod models;
pub mod platform;
pub mod progress;
pub mod search;
pub mod store;
pub mod sync;
