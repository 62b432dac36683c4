//! Normalized output records
//!
//! OpenF1-shaped value objects produced by the translators. Immutable once
//! built; each flush supersedes the previous set for a topic wholesale.

use serde::Serialize;

/// Topics persisted in the live snapshot table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTopic {
    Positions,
    Intervals,
    Laps,
    PitStops,
    Drivers,
    Weather,
    RaceControl,
    TeamRadio,
    Stints,
    Meta,
}

impl SnapshotTopic {
    pub const ALL: [SnapshotTopic; 10] = [
        SnapshotTopic::Positions,
        SnapshotTopic::Intervals,
        SnapshotTopic::Laps,
        SnapshotTopic::PitStops,
        SnapshotTopic::Drivers,
        SnapshotTopic::Weather,
        SnapshotTopic::RaceControl,
        SnapshotTopic::TeamRadio,
        SnapshotTopic::Stints,
        SnapshotTopic::Meta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotTopic::Positions => "positions",
            SnapshotTopic::Intervals => "intervals",
            SnapshotTopic::Laps => "laps",
            SnapshotTopic::PitStops => "pit_stops",
            SnapshotTopic::Drivers => "drivers",
            SnapshotTopic::Weather => "weather",
            SnapshotTopic::RaceControl => "race_control",
            SnapshotTopic::TeamRadio => "team_radio",
            SnapshotTopic::Stints => "stints",
            SnapshotTopic::Meta => "meta",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Driver {
    pub session_key: i64,
    pub driver_number: i64,
    pub broadcast_name: String,
    pub full_name: String,
    pub name_acronym: String,
    pub team_name: String,
    pub team_colour: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headshot_url: Option<String>,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_key: i64,
    pub session_name: String,
    pub session_type: String,
    pub date_start: String,
    pub date_end: String,
    pub gmt_offset: String,
    pub country_key: i64,
    pub country_code: String,
    pub country_name: String,
    pub circuit_key: i64,
    pub circuit_short_name: String,
    pub location: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub session_key: i64,
    pub driver_number: i64,
    pub position: i64,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interval {
    pub session_key: i64,
    pub driver_number: i64,
    pub gap_to_leader: Option<f64>,
    pub interval: Option<f64>,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lap {
    pub session_key: i64,
    pub driver_number: i64,
    pub lap_number: i64,
    pub lap_duration: Option<f64>,
    pub duration_sector_1: Option<f64>,
    pub duration_sector_2: Option<f64>,
    pub duration_sector_3: Option<f64>,
    pub is_pit_out_lap: bool,
    pub st_speed: Option<f64>,
    pub date_start: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PitStop {
    pub session_key: i64,
    pub driver_number: i64,
    pub pit_duration: Option<f64>,
    pub lap_number: i64,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stint {
    pub session_key: i64,
    pub driver_number: i64,
    pub stint_number: i64,
    pub compound: String,
    pub tyre_age_at_start: i64,
    pub lap_start: i64,
    pub lap_end: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Weather {
    pub session_key: i64,
    pub date: String,
    pub air_temperature: f64,
    pub track_temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub rainfall: i64,
    pub wind_direction: f64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceControl {
    pub session_key: i64,
    pub date: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamRadio {
    pub session_key: i64,
    pub driver_number: i64,
    pub date: String,
    pub recording_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LapCount {
    pub current_lap: i64,
    pub total_laps: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackStatus {
    pub status: String,
    pub message: String,
}

/// Session-scoped scalars persisted together under the `meta` topic
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub lap_count: LapCount,
    pub track_status: TrackStatus,
}
