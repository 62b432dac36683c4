//! SessionInfo / LapCount / TrackStatus -> session metadata records

use crate::records::{LapCount, Meta, Session, TrackStatus};
use crate::state::AccumulatedState;
use chrono::{Datelike, Utc};

/// Session metadata, present only once the SessionInfo block has arrived
pub fn translate_session(state: &AccumulatedState, session_key: i64) -> Option<Session> {
    let info = state.session_info();
    info.key?;

    let meeting = info.meeting.unwrap_or_default();
    let country = meeting.country.unwrap_or_default();
    let circuit = meeting.circuit.unwrap_or_default();

    let start_date = info.start_date.unwrap_or_default();
    let year = start_date
        .get(..4)
        .and_then(|y| y.parse().ok())
        .unwrap_or_else(|| Utc::now().year());

    Some(Session {
        session_key,
        session_name: info.name.unwrap_or_default(),
        session_type: info.session_type.unwrap_or_default(),
        date_start: start_date,
        date_end: info.end_date.unwrap_or_default(),
        gmt_offset: info.gmt_offset.unwrap_or_else(|| "+00:00".to_string()),
        country_key: country.key.unwrap_or(0),
        country_code: country.code.unwrap_or_default(),
        country_name: country.name.unwrap_or_default(),
        circuit_key: circuit.key.unwrap_or(0),
        circuit_short_name: circuit.short_name.unwrap_or_default(),
        location: meeting.location.unwrap_or_default(),
        year,
    })
}

/// Session-scoped scalars flushed together under the `meta` topic
pub fn translate_meta(state: &AccumulatedState, session_key: i64) -> Meta {
    let lap_count = state.lap_count();
    let track_status = state.track_status();

    Meta {
        session: translate_session(state, session_key),
        lap_count: LapCount {
            current_lap: lap_count.current_lap.unwrap_or(0),
            total_laps: lap_count.total_laps.unwrap_or(0),
        },
        track_status: TrackStatus {
            status: track_status.status.unwrap_or_else(|| "1".to_string()),
            message: track_status
                .message
                .unwrap_or_else(|| "AllClear".to_string()),
        },
    }
}
