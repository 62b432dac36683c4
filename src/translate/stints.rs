//! TimingAppData -> Stint records

use super::parse::parse_driver_number;
use crate::records::Stint;
use crate::state::AccumulatedState;

/// Compounds the feed is known to report
const KNOWN_COMPOUNDS: [&str; 8] = [
    "SOFT",
    "MEDIUM",
    "HARD",
    "INTERMEDIATE",
    "WET",
    "SUPERSOFT",
    "ULTRASOFT",
    "HYPERSOFT",
];

/// Sentinel for compounds outside the known set (or absent)
pub const UNKNOWN_COMPOUND: &str = "UNKNOWN";

fn normalize_compound(raw: Option<&str>) -> String {
    match raw {
        Some(value) => {
            let upper = value.trim().to_uppercase();
            if KNOWN_COMPOUNDS.contains(&upper.as_str()) {
                upper
            } else {
                UNKNOWN_COMPOUND.to_string()
            }
        }
        None => UNKNOWN_COMPOUND.to_string(),
    }
}

pub fn translate_stints(state: &AccumulatedState, session_key: i64) -> Vec<Stint> {
    let mut stints = Vec::new();

    for (driver_key, line) in state.stint_lines() {
        let Some(driver_stints) = line.stints else {
            continue;
        };
        let driver_number = parse_driver_number(Some(&driver_key));

        // Stint numbers come from the upstream's own integer key ordering,
        // not arrival order
        let mut ordered: Vec<_> = driver_stints.into_iter().collect();
        ordered.sort_by_key(|(key, _)| key.parse::<i64>().unwrap_or(i64::MAX));

        for (key, stint) in ordered {
            let stint_number = key.parse::<i64>().unwrap_or(0) + 1;
            let start_laps = stint.start_laps.unwrap_or(0);

            stints.push(Stint {
                session_key,
                driver_number,
                stint_number,
                compound: normalize_compound(stint.compound.as_deref()),
                tyre_age_at_start: start_laps,
                lap_start: start_laps,
                lap_end: match stint.total_laps {
                    Some(total) if total > 0 => start_laps + total,
                    _ => 0,
                },
            });
        }
    }

    stints
}
