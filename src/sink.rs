//! Live snapshot persistence
//!
//! Translates the accumulated state and upserts one serialized payload per
//! topic, keyed by (session_key, topic). Rows are overwritten in place on
//! every flush; the read API treats a missing row as "no data yet".

use crate::records::SnapshotTopic;
use crate::state::AccumulatedState;
use crate::translate::{
    translate_drivers, translate_intervals, translate_laps, translate_meta, translate_pit_stops,
    translate_positions, translate_race_control, translate_stints, translate_team_radio,
    translate_weather, LapTracker,
};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

const UPSERT_SQL: &str = "INSERT INTO live_state (session_key, topic, data, updated_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (session_key, topic)
     DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at";

#[derive(Debug)]
pub enum SinkError {
    Database(String),
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

impl From<rusqlite::Error> for SinkError {
    fn from(err: rusqlite::Error) -> Self {
        SinkError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err)
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Database(e) => write!(f, "Database error: {}", e),
            SinkError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SinkError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {}

pub struct SnapshotWriter {
    conn: Connection,
    tracker: LapTracker,
}

impl SnapshotWriter {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, SinkError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS live_state (
                session_key INTEGER NOT NULL,
                topic TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (session_key, topic)
            )",
            [],
        )?;

        log::info!("Live snapshot database ready (WAL mode)");
        Ok(Self {
            conn,
            tracker: LapTracker::new(),
        })
    }

    /// Clear lap history and pit detection state before tracking a new session
    pub fn reset_for_new_session(&mut self) {
        self.tracker.reset();
    }

    /// Translate every topic and upsert the results in one transaction
    ///
    /// Skips the write when nothing changed since the last flush, unless
    /// `force` is set (the drain path forces so the final state always
    /// lands).
    pub fn flush(
        &mut self,
        state: &mut AccumulatedState,
        session_key: i64,
        force: bool,
    ) -> Result<(), SinkError> {
        if !state.is_dirty() && !force {
            return Ok(());
        }

        let positions = translate_positions(state, session_key);
        let intervals = translate_intervals(state, session_key);
        let laps = translate_laps(state, session_key, &mut self.tracker);
        let pit_stops = translate_pit_stops(state, session_key, &mut self.tracker);
        let drivers = translate_drivers(state, session_key);
        let weather = translate_weather(state, session_key);
        let race_control = translate_race_control(state, session_key);
        let team_radio = translate_team_radio(state, session_key);
        let stints = translate_stints(state, session_key);
        let meta = translate_meta(state, session_key);

        let mut payloads = Vec::with_capacity(SnapshotTopic::ALL.len());
        for topic in SnapshotTopic::ALL {
            let data = match topic {
                SnapshotTopic::Positions => serde_json::to_string(&positions)?,
                SnapshotTopic::Intervals => serde_json::to_string(&intervals)?,
                SnapshotTopic::Laps => serde_json::to_string(&laps)?,
                SnapshotTopic::PitStops => serde_json::to_string(&pit_stops)?,
                SnapshotTopic::Drivers => serde_json::to_string(&drivers)?,
                SnapshotTopic::Weather => serde_json::to_string(&weather)?,
                SnapshotTopic::RaceControl => serde_json::to_string(&race_control)?,
                SnapshotTopic::TeamRadio => serde_json::to_string(&team_radio)?,
                SnapshotTopic::Stints => serde_json::to_string(&stints)?,
                SnapshotTopic::Meta => serde_json::to_string(&meta)?,
            };
            payloads.push((topic, data));
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (topic, data) in &payloads {
            tx.execute(UPSERT_SQL, params![session_key, topic.as_str(), data, now])?;
        }
        tx.commit()?;

        state.clear_dirty();
        log::info!(
            "Flushed {} topics (session {}, {} positions, {} laps, {} drivers)",
            payloads.len(),
            session_key,
            positions.len(),
            laps.len(),
            drivers.len()
        );
        Ok(())
    }
}
