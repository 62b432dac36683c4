//! TeamRadio -> TeamRadio records

use crate::records::TeamRadio;
use crate::state::AccumulatedState;
use chrono::Utc;

const STATIC_BASE: &str = "https://livetiming.formula1.com/static/";

pub fn translate_team_radio(state: &AccumulatedState, session_key: i64) -> Vec<TeamRadio> {
    state
        .team_radio()
        .iter()
        .filter_map(|capture| {
            let racing_number = capture.racing_number.as_deref()?;
            let path = capture.path.as_deref()?;

            let recording_url = if path.starts_with("http") {
                path.to_string()
            } else {
                format!("{}{}", STATIC_BASE, path)
            };

            Some(TeamRadio {
                session_key,
                driver_number: racing_number.trim().parse().unwrap_or(0),
                date: capture
                    .utc
                    .clone()
                    .unwrap_or_else(|| Utc::now().to_rfc3339()),
                recording_url,
            })
        })
        .collect()
}
