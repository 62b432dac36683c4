//! Raw live timing message shapes
//!
//! Field names match the wire format of the F1 SignalR feed, limited to the
//! fields the translators read; serde drops the rest of each payload. Every
//! field is optional: topic updates are deltas and may carry any subset of a
//! record.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Index-keyed collections arrive as arrays in the initial snapshot and as
/// objects keyed by index in deltas; both land in the same map.
fn indexed_map<'de, D, T>(deserializer: D) -> Result<Option<HashMap<String, T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape<T> {
        Map(HashMap<String, T>),
        List(Vec<T>),
    }

    Ok(match Option::<Shape<T>>::deserialize(deserializer)? {
        None => None,
        Some(Shape::Map(map)) => Some(map),
        Some(Shape::List(items)) => Some(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
    })
}

/// Topics subscribed on the Streaming hub
pub const SUBSCRIBED_TOPICS: [&str; 10] = [
    "TimingData",
    "DriverList",
    "RaceControlMessages",
    "WeatherData",
    "TeamRadio",
    "TimingAppData",
    "SessionInfo",
    "LapCount",
    "TrackStatus",
    "Heartbeat",
];

// ---------------------------------------------------------------------------
// TimingData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimingLine {
    #[serde(rename = "RacingNumber")]
    pub racing_number: Option<String>,
    #[serde(rename = "Position")]
    pub position: Option<String>,
    #[serde(rename = "GapToLeader")]
    pub gap_to_leader: Option<String>,
    #[serde(rename = "IntervalToPositionAhead")]
    pub interval_to_position_ahead: Option<IntervalValue>,
    #[serde(rename = "NumberOfLaps")]
    pub number_of_laps: Option<i64>,
    #[serde(rename = "LastLapTime")]
    pub last_lap_time: Option<TimeValue>,
    #[serde(rename = "Sectors", default, deserialize_with = "indexed_map")]
    pub sectors: Option<HashMap<String, SectorValue>>,
    #[serde(rename = "Speeds")]
    pub speeds: Option<Speeds>,
    #[serde(rename = "InPit")]
    pub in_pit: Option<bool>,
    #[serde(rename = "PitOut")]
    pub pit_out: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntervalValue {
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeValue {
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectorValue {
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Speeds {
    #[serde(rename = "ST")]
    pub speed_trap: Option<TimeValue>,
}

// ---------------------------------------------------------------------------
// DriverList
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverEntry {
    #[serde(rename = "RacingNumber")]
    pub racing_number: Option<String>,
    #[serde(rename = "BroadcastName")]
    pub broadcast_name: Option<String>,
    #[serde(rename = "FullName")]
    pub full_name: Option<String>,
    #[serde(rename = "Tla")]
    pub tla: Option<String>,
    #[serde(rename = "TeamName")]
    pub team_name: Option<String>,
    #[serde(rename = "TeamColour")]
    pub team_colour: Option<String>,
    #[serde(rename = "FirstName")]
    pub first_name: Option<String>,
    #[serde(rename = "LastName")]
    pub last_name: Option<String>,
    #[serde(rename = "HeadshotUrl")]
    pub headshot_url: Option<String>,
    #[serde(rename = "CountryCode")]
    pub country_code: Option<String>,
}

// ---------------------------------------------------------------------------
// RaceControlMessages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaceControlEntry {
    #[serde(rename = "Utc")]
    pub utc: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Flag")]
    pub flag: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
    #[serde(rename = "Scope")]
    pub scope: Option<String>,
    #[serde(rename = "RacingNumber")]
    pub racing_number: Option<String>,
    #[serde(rename = "Lap")]
    pub lap: Option<i64>,
}

// ---------------------------------------------------------------------------
// WeatherData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherMessage {
    #[serde(rename = "AirTemp")]
    pub air_temp: Option<String>,
    #[serde(rename = "TrackTemp")]
    pub track_temp: Option<String>,
    #[serde(rename = "Humidity")]
    pub humidity: Option<String>,
    #[serde(rename = "Pressure")]
    pub pressure: Option<String>,
    #[serde(rename = "Rainfall")]
    pub rainfall: Option<String>,
    #[serde(rename = "WindDirection")]
    pub wind_direction: Option<String>,
    #[serde(rename = "WindSpeed")]
    pub wind_speed: Option<String>,
}

// ---------------------------------------------------------------------------
// TeamRadio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RadioCapture {
    #[serde(rename = "RacingNumber")]
    pub racing_number: Option<String>,
    #[serde(rename = "Utc")]
    pub utc: Option<String>,
    #[serde(rename = "Path")]
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// TimingAppData (stints)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StintLine {
    #[serde(rename = "Stints", default, deserialize_with = "indexed_map")]
    pub stints: Option<HashMap<String, StintEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StintEntry {
    #[serde(rename = "Compound")]
    pub compound: Option<String>,
    #[serde(rename = "TotalLaps")]
    pub total_laps: Option<i64>,
    #[serde(rename = "StartLaps")]
    pub start_laps: Option<i64>,
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionInfoMessage {
    #[serde(rename = "Key")]
    pub key: Option<i64>,
    #[serde(rename = "Type")]
    pub session_type: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "StartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "EndDate")]
    pub end_date: Option<String>,
    #[serde(rename = "GmtOffset")]
    pub gmt_offset: Option<String>,
    #[serde(rename = "Meeting")]
    pub meeting: Option<Meeting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meeting {
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<MeetingCountry>,
    #[serde(rename = "Circuit")]
    pub circuit: Option<MeetingCircuit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingCountry {
    #[serde(rename = "Key")]
    pub key: Option<i64>,
    #[serde(rename = "Code")]
    pub code: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingCircuit {
    #[serde(rename = "Key")]
    pub key: Option<i64>,
    #[serde(rename = "ShortName")]
    pub short_name: Option<String>,
}

// ---------------------------------------------------------------------------
// LapCount / TrackStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LapCountMessage {
    #[serde(rename = "CurrentLap")]
    pub current_lap: Option<i64>,
    #[serde(rename = "TotalLaps")]
    pub total_laps: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackStatusMessage {
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
}
