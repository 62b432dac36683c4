//! Worker configuration from environment variables

use std::env;

/// Configuration for the ingestion worker
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub db_path: String,

    /// Base URL of the SignalR live timing endpoint
    pub feed_url: String,

    /// URL of the SessionInfo discovery endpoint
    pub session_info_url: String,

    /// URL of the Jolpica season calendar
    pub schedule_url: String,

    /// Discovery poll interval while awake (milliseconds)
    pub discovery_poll_ms: u64,

    /// Snapshot flush interval while a session is live (milliseconds)
    pub flush_interval_ms: u64,

    /// Grace period after a session completes before the final flush (milliseconds)
    pub session_end_grace_ms: u64,

    /// Maximum feed reconnect attempts before the session is finalized
    pub feed_max_reconnect_attempts: u32,

    /// Post-session ingest command line (empty = disabled)
    pub ingest_command: String,

    /// Wall-clock timeout for the post-session ingest command (seconds)
    pub ingest_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PITWALL_DB_PATH` (default: pitwall.db)
    /// - `PITWALL_FEED_URL` (default: https://livetiming.formula1.com/signalr)
    /// - `PITWALL_SESSION_INFO_URL` (default: https://livetiming.formula1.com/static/SessionInfo.json)
    /// - `PITWALL_SCHEDULE_URL` (default: https://api.jolpi.ca/ergast/f1/2026.json)
    /// - `PITWALL_DISCOVERY_POLL_MS` (default: 60000)
    /// - `PITWALL_FLUSH_INTERVAL_MS` (default: 3000)
    /// - `PITWALL_SESSION_END_GRACE_MS` (default: 30000)
    /// - `PITWALL_FEED_MAX_RECONNECT_ATTEMPTS` (default: 10)
    /// - `PITWALL_INGEST_COMMAND` (default: empty, disabled)
    /// - `PITWALL_INGEST_TIMEOUT_SECS` (default: 600)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("PITWALL_DB_PATH").unwrap_or_else(|_| "pitwall.db".to_string()),

            feed_url: env::var("PITWALL_FEED_URL")
                .unwrap_or_else(|_| "https://livetiming.formula1.com/signalr".to_string()),

            session_info_url: env::var("PITWALL_SESSION_INFO_URL").unwrap_or_else(|_| {
                "https://livetiming.formula1.com/static/SessionInfo.json".to_string()
            }),

            schedule_url: env::var("PITWALL_SCHEDULE_URL")
                .unwrap_or_else(|_| "https://api.jolpi.ca/ergast/f1/2026.json".to_string()),

            discovery_poll_ms: env::var("PITWALL_DISCOVERY_POLL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60_000),

            flush_interval_ms: env::var("PITWALL_FLUSH_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3_000),

            session_end_grace_ms: env::var("PITWALL_SESSION_END_GRACE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),

            feed_max_reconnect_attempts: env::var("PITWALL_FEED_MAX_RECONNECT_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            ingest_command: env::var("PITWALL_INGEST_COMMAND").unwrap_or_default(),

            ingest_timeout_secs: env::var("PITWALL_INGEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
        }
    }
}
