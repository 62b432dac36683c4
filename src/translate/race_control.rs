//! RaceControlMessages -> RaceControl records

use crate::records::RaceControl;
use crate::state::AccumulatedState;
use chrono::Utc;

pub fn translate_race_control(state: &AccumulatedState, session_key: i64) -> Vec<RaceControl> {
    state
        .race_control()
        .iter()
        .map(|entry| RaceControl {
            session_key,
            date: entry
                .utc
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            category: entry.category.clone().unwrap_or_else(|| "Other".to_string()),
            flag: entry.flag.clone(),
            message: entry.message.clone().unwrap_or_default(),
            scope: entry.scope.clone(),
            driver_number: entry
                .racing_number
                .as_deref()
                .and_then(|n| n.trim().parse().ok()),
            lap_number: entry.lap,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_state_yields_no_messages() {
        let state = AccumulatedState::new();
        assert!(translate_race_control(&state, 9999).is_empty());
    }

    #[test]
    fn test_full_entry_translates() {
        let mut state = AccumulatedState::new();
        state.apply(
            "RaceControlMessages",
            &json!({"Messages": {"2": {
                "Utc": "2026-03-08T05:12:44Z",
                "Category": "Flag",
                "Flag": "YELLOW",
                "Message": "YELLOW IN TRACK SECTOR 7",
                "Scope": "Sector",
                "RacingNumber": "18",
                "Lap": 12
            }}}),
        );

        let messages = translate_race_control(&state, 9999);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].date, "2026-03-08T05:12:44Z");
        assert_eq!(messages[0].category, "Flag");
        assert_eq!(messages[0].flag.as_deref(), Some("YELLOW"));
        assert_eq!(messages[0].driver_number, Some(18));
        assert_eq!(messages[0].lap_number, Some(12));
    }

    #[test]
    fn test_sparse_entry_gets_defaults() {
        let mut state = AccumulatedState::new();
        state.apply(
            "RaceControlMessages",
            &json!({"Messages": {"0": {"Message": "GREEN LIGHT - PIT EXIT OPEN"}}}),
        );

        let messages = translate_race_control(&state, 9999);
        assert_eq!(messages[0].category, "Other");
        assert!(messages[0].driver_number.is_none());
        // Missing timestamp defaults to translation time, not an error
        assert!(!messages[0].date.is_empty());
    }
}
