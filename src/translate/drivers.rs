//! DriverList -> Driver records

use super::parse::parse_driver_number;
use crate::records::Driver;
use crate::state::AccumulatedState;

pub fn translate_drivers(state: &AccumulatedState, session_key: i64) -> Vec<Driver> {
    state
        .drivers()
        .into_iter()
        // Entries without an identity are partial deltas for drivers we have
        // not seen in full yet
        .filter(|(_, entry)| entry.racing_number.is_some() || entry.tla.is_some())
        .map(|(number, entry)| Driver {
            session_key,
            driver_number: parse_driver_number(
                entry.racing_number.as_deref().or(Some(number.as_str())),
            ),
            broadcast_name: entry.broadcast_name.unwrap_or_default(),
            full_name: entry.full_name.unwrap_or_default(),
            name_acronym: entry.tla.unwrap_or_default(),
            team_name: entry.team_name.unwrap_or_default(),
            team_colour: entry.team_colour.unwrap_or_default(),
            first_name: entry.first_name.unwrap_or_default(),
            last_name: entry.last_name.unwrap_or_default(),
            headshot_url: entry.headshot_url,
            country_code: entry.country_code.unwrap_or_default(),
        })
        .collect()
}
