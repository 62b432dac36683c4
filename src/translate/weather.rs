//! WeatherData -> Weather records

use super::parse::parse_f64_or_zero;
use crate::records::Weather;
use crate::state::AccumulatedState;

pub fn translate_weather(state: &AccumulatedState, session_key: i64) -> Vec<Weather> {
    state
        .weather()
        .iter()
        .map(|snapshot| Weather {
            session_key,
            date: snapshot.received_at.to_rfc3339(),
            air_temperature: parse_f64_or_zero(snapshot.data.air_temp.as_deref()),
            track_temperature: parse_f64_or_zero(snapshot.data.track_temp.as_deref()),
            humidity: parse_f64_or_zero(snapshot.data.humidity.as_deref()),
            pressure: parse_f64_or_zero(snapshot.data.pressure.as_deref()),
            rainfall: match snapshot.data.rainfall.as_deref() {
                Some("1") | Some("true") => 1,
                _ => 0,
            },
            wind_direction: parse_f64_or_zero(snapshot.data.wind_direction.as_deref()),
            wind_speed: parse_f64_or_zero(snapshot.data.wind_speed.as_deref()),
        })
        .collect()
}
