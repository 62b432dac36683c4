//! Translator pipeline
//!
//! One pure mapping per topic from accumulated state to normalized records.
//! Every translator tolerates missing upstream state (empty result, never an
//! error) and is safe to call on every flush tick.

pub mod drivers;
pub mod parse;
pub mod race_control;
pub mod session;
pub mod stints;
pub mod team_radio;
pub mod timing;
pub mod weather;

pub use drivers::translate_drivers;
pub use race_control::translate_race_control;
pub use session::{translate_meta, translate_session};
pub use stints::translate_stints;
pub use team_radio::translate_team_radio;
pub use timing::{
    translate_intervals, translate_laps, translate_pit_stops, translate_positions, LapTracker,
};
pub use weather::translate_weather;
