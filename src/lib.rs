//! pitwall - live timing ingestion worker
//!
//! Tracks one live F1 session at a time: discovers the active session,
//! subscribes to the official SignalR feed, merges per-topic deltas into an
//! in-memory snapshot and flushes normalized rows into SQLite on a fixed
//! interval. When the session archive is marked complete, a final flush runs
//! and the post-session ingest command is fired.

pub mod config;
pub mod discovery;
pub mod feed;
pub mod ingest_job;
pub mod lifecycle;
pub mod records;
pub mod retry;
pub mod schedule;
pub mod sink;
pub mod state;
pub mod translate;
