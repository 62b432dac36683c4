//! TimingData -> Position, Interval, Lap and PitStop records
//!
//! Positions and intervals are pure snapshots of the latest timing lines.
//! Laps and pit stops need memory across flushes (a lap disappears from the
//! live lines once the next one starts, and a pit stop is an InPit edge),
//! carried by [`LapTracker`] and reset per session.

use super::parse::{parse_driver_number, parse_gap, parse_lap_time};
use crate::records::{Interval, Lap, PitStop, Position};
use crate::state::AccumulatedState;
use chrono::Utc;
use std::collections::HashMap;

/// Cross-flush memory for lap history and pit detection
#[derive(Debug, Default)]
pub struct LapTracker {
    laps: HashMap<(i64, i64), Lap>,
    pit_stops: Vec<PitStop>,
    in_pit: HashMap<i64, bool>,
}

impl LapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.laps.clear();
        self.pit_stops.clear();
        self.in_pit.clear();
    }
}

pub fn translate_positions(state: &AccumulatedState, session_key: i64) -> Vec<Position> {
    let now = Utc::now().to_rfc3339();
    let mut positions: Vec<Position> = state
        .timing_lines()
        .into_iter()
        .filter_map(|(driver_key, line)| {
            let position = line.position.as_deref()?.trim().parse().ok()?;
            Some(Position {
                session_key,
                driver_number: parse_driver_number(Some(&driver_key)),
                position,
                date: now.clone(),
            })
        })
        .collect();

    positions.sort_by_key(|p| p.position);
    positions
}

pub fn translate_intervals(state: &AccumulatedState, session_key: i64) -> Vec<Interval> {
    let now = Utc::now().to_rfc3339();
    state
        .timing_lines()
        .into_iter()
        .map(|(driver_key, line)| Interval {
            session_key,
            driver_number: parse_driver_number(Some(&driver_key)),
            gap_to_leader: line.gap_to_leader.as_deref().and_then(parse_gap),
            interval: line
                .interval_to_position_ahead
                .and_then(|i| i.value)
                .as_deref()
                .and_then(parse_gap),
            date: now.clone(),
        })
        .collect()
}

/// Fold the latest timing lines into the per-driver lap history
///
/// A driver's current lap number comes from `NumberOfLaps`; timing fields
/// seen while that lap is current update its record in place.
pub fn translate_laps(
    state: &AccumulatedState,
    session_key: i64,
    tracker: &mut LapTracker,
) -> Vec<Lap> {
    let now = Utc::now().to_rfc3339();

    for (driver_key, line) in state.timing_lines() {
        let Some(lap_number) = line.number_of_laps.filter(|n| *n >= 1) else {
            continue;
        };
        let driver_number = parse_driver_number(Some(&driver_key));

        let lap = tracker
            .laps
            .entry((driver_number, lap_number))
            .or_insert_with(|| Lap {
                session_key,
                driver_number,
                lap_number,
                lap_duration: None,
                duration_sector_1: None,
                duration_sector_2: None,
                duration_sector_3: None,
                is_pit_out_lap: line.pit_out == Some(true),
                st_speed: None,
                date_start: now.clone(),
            });

        if let Some(value) = line.last_lap_time.as_ref().and_then(|t| t.value.as_deref()) {
            if let Some(duration) = parse_lap_time(value) {
                lap.lap_duration = Some(duration);
            }
        }

        if let Some(sectors) = &line.sectors {
            let sector = |key: &str| {
                sectors
                    .get(key)
                    .and_then(|s| s.value.as_deref())
                    .and_then(parse_lap_time)
            };
            if let Some(d) = sector("0") {
                lap.duration_sector_1 = Some(d);
            }
            if let Some(d) = sector("1") {
                lap.duration_sector_2 = Some(d);
            }
            if let Some(d) = sector("2") {
                lap.duration_sector_3 = Some(d);
            }
        }

        if let Some(speed) = line
            .speeds
            .as_ref()
            .and_then(|s| s.speed_trap.as_ref())
            .and_then(|st| st.value.as_deref())
            .and_then(|v| v.trim().parse::<f64>().ok())
        {
            if speed > 0.0 {
                lap.st_speed = Some(speed);
            }
        }

        if line.pit_out == Some(true) {
            lap.is_pit_out_lap = true;
        }
    }

    let mut laps: Vec<Lap> = tracker.laps.values().cloned().collect();
    laps.sort_by_key(|l| (l.driver_number, l.lap_number));
    laps
}

/// Detect pit stops as the InPit false -> true edge
pub fn translate_pit_stops(
    state: &AccumulatedState,
    session_key: i64,
    tracker: &mut LapTracker,
) -> Vec<PitStop> {
    let now = Utc::now().to_rfc3339();

    for (driver_key, line) in state.timing_lines() {
        let driver_number = parse_driver_number(Some(&driver_key));
        let was_in_pit = tracker.in_pit.get(&driver_number).copied().unwrap_or(false);
        let is_in_pit = line.in_pit == Some(true);

        if is_in_pit && !was_in_pit {
            let lap_number = line.number_of_laps.unwrap_or(0);
            let already_recorded = tracker
                .pit_stops
                .iter()
                .any(|p| p.driver_number == driver_number && p.lap_number == lap_number);
            if !already_recorded {
                tracker.pit_stops.push(PitStop {
                    session_key,
                    driver_number,
                    // Stop duration is not on the live feed; backfilled by
                    // the post-session ingest
                    pit_duration: None,
                    lap_number,
                    date: now.clone(),
                });
            }
        }

        if line.in_pit.is_some() {
            tracker.in_pit.insert(driver_number, is_in_pit);
        }
    }

    tracker.pit_stops.clone()
}
