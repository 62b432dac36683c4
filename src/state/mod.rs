//! Accumulated session state
//!
//! Topic-keyed store that merges feed deltas into the latest known view of
//! the tracked session. Created empty at session start, mutated only by the
//! lifecycle controller's event loop, discarded in full when the session
//! ends. Raw payloads stay loosely typed through the merge step only; every
//! read path goes through the typed accessors.

pub mod merge;

use crate::feed::messages::{
    DriverEntry, LapCountMessage, RaceControlEntry, RadioCapture, SessionInfoMessage, StintLine,
    TimingLine, TrackStatusMessage, WeatherMessage,
};
use chrono::{DateTime, Utc};
use merge::deep_merge;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;

/// One weather reading with its receipt time
///
/// Weather updates are whole snapshots, so the series keeps one entry per
/// update instead of merging.
#[derive(Debug, Clone)]
pub struct WeatherSnapshot {
    pub received_at: DateTime<Utc>,
    pub data: WeatherMessage,
}

#[derive(Debug)]
pub struct AccumulatedState {
    timing_data: Value,
    timing_app_data: Value,
    driver_list: Value,
    session_info: Value,
    lap_count: Value,
    track_status: Value,
    weather: Vec<WeatherSnapshot>,
    race_control: Vec<RaceControlEntry>,
    team_radio: Vec<RadioCapture>,
    seen_race_control: HashSet<String>,
    seen_radio: HashSet<String>,
    dirty: bool,
}

impl Default for AccumulatedState {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatedState {
    pub fn new() -> Self {
        Self {
            timing_data: json!({}),
            timing_app_data: json!({}),
            driver_list: json!({}),
            session_info: json!({}),
            lap_count: json!({}),
            track_status: json!({}),
            weather: Vec::new(),
            race_control: Vec::new(),
            team_radio: Vec::new(),
            seen_race_control: HashSet::new(),
            seen_radio: HashSet::new(),
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Apply one raw topic update
    ///
    /// Never fails: unknown topics and unparsable entries are dropped with a
    /// log line, a single bad field must not halt ingestion of the rest.
    pub fn apply(&mut self, topic: &str, payload: &Value) {
        match topic {
            "TimingData" => {
                deep_merge(&mut self.timing_data, payload);
                self.dirty = true;
            }
            "TimingAppData" => {
                deep_merge(&mut self.timing_app_data, payload);
                self.dirty = true;
            }
            "DriverList" => {
                deep_merge(&mut self.driver_list, payload);
                self.dirty = true;
            }
            "SessionInfo" => {
                deep_merge(&mut self.session_info, payload);
                self.dirty = true;
            }
            "LapCount" => {
                deep_merge(&mut self.lap_count, payload);
                self.dirty = true;
            }
            "TrackStatus" => {
                deep_merge(&mut self.track_status, payload);
                self.dirty = true;
            }
            "WeatherData" => self.append_weather(payload),
            "RaceControlMessages" => self.append_race_control(payload),
            "TeamRadio" => self.append_team_radio(payload),
            "Heartbeat" => {
                // Liveness only, nothing to accumulate
            }
            other => log::debug!("Ignoring unknown topic: {}", other),
        }
    }

    fn append_weather(&mut self, payload: &Value) {
        match serde_json::from_value::<WeatherMessage>(payload.clone()) {
            Ok(data) => {
                self.weather.push(WeatherSnapshot {
                    received_at: Utc::now(),
                    data,
                });
                self.dirty = true;
            }
            Err(e) => log::warn!("Dropping unparsable weather update: {}", e),
        }
    }

    fn append_race_control(&mut self, payload: &Value) {
        let Some(messages) = payload.get("Messages") else {
            return;
        };
        for (index, raw) in indexed_entries(messages) {
            let Ok(entry) = serde_json::from_value::<RaceControlEntry>(raw.clone()) else {
                log::warn!("Dropping unparsable race control entry {}", index);
                continue;
            };
            let key = format!(
                "{}_{}_{}",
                index,
                entry.utc.as_deref().unwrap_or(""),
                entry.message.as_deref().unwrap_or("")
            );
            if self.seen_race_control.insert(key) {
                self.race_control.push(entry);
                self.dirty = true;
            }
        }
    }

    fn append_team_radio(&mut self, payload: &Value) {
        let Some(captures) = payload.get("Captures") else {
            return;
        };
        for (index, raw) in indexed_entries(captures) {
            let Ok(capture) = serde_json::from_value::<RadioCapture>(raw.clone()) else {
                log::warn!("Dropping unparsable team radio capture {}", index);
                continue;
            };
            let key = format!(
                "{}_{}_{}",
                index,
                capture.utc.as_deref().unwrap_or(""),
                capture.racing_number.as_deref().unwrap_or("")
            );
            if self.seen_radio.insert(key) {
                self.team_radio.push(capture);
                self.dirty = true;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Typed views over the merged state
    // -----------------------------------------------------------------------

    /// Per-driver timing lines, sorted by racing number
    pub fn timing_lines(&self) -> Vec<(String, TimingLine)> {
        typed_entries(self.timing_data.get("Lines").unwrap_or(&Value::Null))
    }

    /// Per-driver stint lines, sorted by racing number
    pub fn stint_lines(&self) -> Vec<(String, StintLine)> {
        typed_entries(self.timing_app_data.get("Lines").unwrap_or(&Value::Null))
    }

    /// Driver identity entries, sorted by racing number
    pub fn drivers(&self) -> Vec<(String, DriverEntry)> {
        typed_entries(&self.driver_list)
    }

    pub fn session_info(&self) -> SessionInfoMessage {
        serde_json::from_value(self.session_info.clone()).unwrap_or_default()
    }

    pub fn lap_count(&self) -> LapCountMessage {
        serde_json::from_value(self.lap_count.clone()).unwrap_or_default()
    }

    pub fn track_status(&self) -> TrackStatusMessage {
        serde_json::from_value(self.track_status.clone()).unwrap_or_default()
    }

    pub fn weather(&self) -> &[WeatherSnapshot] {
        &self.weather
    }

    pub fn race_control(&self) -> &[RaceControlEntry] {
        &self.race_control
    }

    pub fn team_radio(&self) -> &[RadioCapture] {
        &self.team_radio
    }
}

/// Entries of a collection that arrives either as an array (initial
/// snapshot) or as an object keyed by index (deltas)
fn indexed_entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        _ => Vec::new(),
    }
}

/// Deserialize each object entry of a driver-keyed map, skipping metadata
/// keys (the feed mixes flags like `_kf` into these maps) and entries that
/// fail to parse. Sorted numerically by racing number.
fn typed_entries<T: DeserializeOwned>(value: &Value) -> Vec<(String, T)> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };

    let mut entries: Vec<(String, T)> = map
        .iter()
        .filter(|(_, v)| v.is_object())
        .filter_map(|(k, v)| match serde_json::from_value(v.clone()) {
            Ok(parsed) => Some((k.clone(), parsed)),
            Err(e) => {
                log::debug!("Skipping unparsable entry {}: {}", k, e);
                None
            }
        })
        .collect();

    entries.sort_by_key(|(k, _)| k.parse::<i64>().unwrap_or(i64::MAX));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_list_fragments_merge_not_replace() {
        let mut state = AccumulatedState::new();
        state.apply(
            "DriverList",
            &json!({"1": {"RacingNumber": "1", "Tla": "VER"}}),
        );
        state.apply("DriverList", &json!({"1": {"TeamName": "Red Bull"}}));

        let drivers = state.drivers();
        assert_eq!(drivers.len(), 1);
        let (number, entry) = &drivers[0];
        assert_eq!(number, "1");
        assert_eq!(entry.tla.as_deref(), Some("VER"));
        assert_eq!(entry.team_name.as_deref(), Some("Red Bull"));
    }

    #[test]
    fn test_timing_partial_updates_merge_per_field() {
        let mut state = AccumulatedState::new();
        state.apply("TimingData", &json!({"Lines": {"44": {"Position": "3"}}}));
        state.apply(
            "TimingData",
            &json!({"Lines": {"44": {"GapToLeader": "+1.2"}}}),
        );

        let lines = state.timing_lines();
        assert_eq!(lines.len(), 1);
        let (_, line) = &lines[0];
        assert_eq!(line.position.as_deref(), Some("3"));
        assert_eq!(line.gap_to_leader.as_deref(), Some("+1.2"));
    }

    #[test]
    fn test_weather_is_append_only() {
        let mut state = AccumulatedState::new();
        state.apply("WeatherData", &json!({"AirTemp": "24.5"}));
        state.apply("WeatherData", &json!({"AirTemp": "25.0"}));

        assert_eq!(state.weather().len(), 2);
        assert_eq!(state.weather()[0].data.air_temp.as_deref(), Some("24.5"));
        assert_eq!(state.weather()[1].data.air_temp.as_deref(), Some("25.0"));
    }

    #[test]
    fn test_race_control_dedupes_replayed_entries() {
        let mut state = AccumulatedState::new();
        let payload = json!({
            "Messages": {"4": {"Utc": "2026-03-08T05:03:00Z", "Message": "GREEN LIGHT"}}
        });
        state.apply("RaceControlMessages", &payload);
        state.apply("RaceControlMessages", &payload);

        assert_eq!(state.race_control().len(), 1);
    }

    #[test]
    fn test_race_control_initial_snapshot_array_shape() {
        let mut state = AccumulatedState::new();
        state.apply(
            "RaceControlMessages",
            &json!({"Messages": [
                {"Utc": "2026-03-08T05:00:00Z", "Message": "DRS DISABLED"},
                {"Utc": "2026-03-08T05:01:00Z", "Message": "DRS ENABLED"}
            ]}),
        );

        assert_eq!(state.race_control().len(), 2);
    }

    #[test]
    fn test_team_radio_dedupes_by_capture_key() {
        let mut state = AccumulatedState::new();
        let payload = json!({
            "Captures": {"0": {"RacingNumber": "44", "Utc": "2026-03-08T05:04:00Z", "Path": "a.mp3"}}
        });
        state.apply("TeamRadio", &payload);
        state.apply("TeamRadio", &payload);

        assert_eq!(state.team_radio().len(), 1);
    }

    #[test]
    fn test_sector_array_snapshot_shape_parses() {
        // The initial snapshot sends Sectors as an array, deltas as an
        // index-keyed object
        let mut state = AccumulatedState::new();
        state.apply(
            "TimingData",
            &json!({"Lines": {"44": {"Sectors": [{"Value": "28.5"}, {"Value": "30.1"}]}}}),
        );

        let lines = state.timing_lines();
        assert_eq!(lines.len(), 1);
        let sectors = lines[0].1.sectors.as_ref().expect("sectors");
        assert_eq!(sectors.get("0").and_then(|s| s.value.as_deref()), Some("28.5"));
        assert_eq!(sectors.get("1").and_then(|s| s.value.as_deref()), Some("30.1"));
    }

    #[test]
    fn test_lap_count_latest_write_wins() {
        let mut state = AccumulatedState::new();
        state.apply("LapCount", &json!({"CurrentLap": 1, "TotalLaps": 57}));
        state.apply("LapCount", &json!({"CurrentLap": 2}));

        let lap_count = state.lap_count();
        assert_eq!(lap_count.current_lap, Some(2));
        assert_eq!(lap_count.total_laps, Some(57));
    }

    #[test]
    fn test_unknown_topic_and_bad_shapes_are_harmless() {
        let mut state = AccumulatedState::new();
        state.apply("Nonsense", &json!({"a": 1}));
        state.apply("WeatherData", &json!("not an object"));
        state.apply("RaceControlMessages", &json!({"Messages": 42}));
        state.apply("Heartbeat", &json!({"Utc": "2026-03-08T05:00:00Z"}));

        assert!(!state.is_dirty());
        assert!(state.weather().is_empty());
        assert!(state.race_control().is_empty());
    }

    #[test]
    fn test_metadata_keys_skipped_in_typed_views() {
        let mut state = AccumulatedState::new();
        state.apply("DriverList", &json!({"_kf": true, "81": {"Tla": "PIA"}}));

        let drivers = state.drivers();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].0, "81");
    }

    #[test]
    fn test_empty_state_views_are_empty() {
        let state = AccumulatedState::new();
        assert!(state.timing_lines().is_empty());
        assert!(state.stint_lines().is_empty());
        assert!(state.drivers().is_empty());
        assert!(state.session_info().key.is_none());
    }

    #[test]
    fn test_dirty_flag_lifecycle() {
        let mut state = AccumulatedState::new();
        assert!(!state.is_dirty());

        state.apply("TrackStatus", &json!({"Status": "1"}));
        assert!(state.is_dirty());

        state.clear_dirty();
        assert!(!state.is_dirty());
    }
}
