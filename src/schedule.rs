//! Season calendar
//!
//! The worker sleeps between race weekends instead of polling discovery
//! year-round. The Jolpica/Ergast calendar gives every session start time;
//! the worker wakes an hour before the first session of the next weekend and
//! stays awake until the last one has ended.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

fn wake_before() -> ChronoDuration {
    ChronoDuration::hours(1)
}

fn post_race_buffer() -> ChronoDuration {
    ChronoDuration::hours(4)
}

fn session_duration() -> ChronoDuration {
    ChronoDuration::hours(3)
}

fn test_day_duration() -> ChronoDuration {
    ChronoDuration::hours(9)
}

#[derive(Debug, Clone)]
pub struct ScheduledSession {
    pub round: u32,
    pub race_name: String,
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub duration: ChronoDuration,
}

#[derive(Debug, Clone)]
pub struct Wakeup {
    pub session: ScheduledSession,
    pub sleep: Duration,
    pub weekend_end: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ScheduleError {
    Http(String),
    Shape(String),
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::Http(e) => write!(f, "Schedule fetch error: {}", e),
            ScheduleError::Shape(e) => write!(f, "Schedule parse error: {}", e),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        ScheduleError::Http(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Jolpica response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JolpicaResponse {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Debug, Deserialize)]
struct MrData {
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<JolpicaRace>,
}

#[derive(Debug, Deserialize)]
struct JolpicaRace {
    round: String,
    #[serde(rename = "raceName")]
    race_name: String,
    date: String,
    time: Option<String>,
    #[serde(rename = "FirstPractice")]
    first_practice: Option<SessionTime>,
    #[serde(rename = "SecondPractice")]
    second_practice: Option<SessionTime>,
    #[serde(rename = "ThirdPractice")]
    third_practice: Option<SessionTime>,
    #[serde(rename = "SprintQualifying")]
    sprint_qualifying: Option<SessionTime>,
    #[serde(rename = "Sprint")]
    sprint: Option<SessionTime>,
    #[serde(rename = "Qualifying")]
    qualifying: Option<SessionTime>,
}

#[derive(Debug, Deserialize)]
struct SessionTime {
    date: String,
    time: String,
}

// ---------------------------------------------------------------------------
// Fetch & parse
// ---------------------------------------------------------------------------

/// Pre-season testing is not in the Ergast calendar
fn pre_season_testing() -> Vec<ScheduledSession> {
    ["2026-02-10T23:00:00Z", "2026-02-11T23:00:00Z", "2026-02-12T23:00:00Z"]
        .iter()
        .enumerate()
        .filter_map(|(day, start)| {
            let start_time = start.parse().ok()?;
            Some(ScheduledSession {
                round: 0,
                race_name: "Bahrain Pre-Season Test".to_string(),
                session_name: format!("Day {}", day + 1),
                start_time,
                duration: test_day_duration(),
            })
        })
        .collect()
}

fn parse_start(date: &str, time: &str) -> Option<DateTime<Utc>> {
    format!("{}T{}", date, time)
        .parse::<DateTime<Utc>>()
        .ok()
}

fn parse_calendar(response: JolpicaResponse) -> Vec<ScheduledSession> {
    let mut sessions = pre_season_testing();

    for race in response.mr_data.race_table.races {
        let round: u32 = race.round.parse().unwrap_or(0);

        let mut add = |name: &str, st: Option<&SessionTime>| {
            let Some(st) = st else { return };
            let Some(start_time) = parse_start(&st.date, &st.time) else {
                return;
            };
            sessions.push(ScheduledSession {
                round,
                race_name: race.race_name.clone(),
                session_name: name.to_string(),
                start_time,
                duration: session_duration(),
            });
        };

        add("FP1", race.first_practice.as_ref());
        add("FP2", race.second_practice.as_ref());
        add("Sprint Qualifying", race.sprint_qualifying.as_ref());
        add("FP3", race.third_practice.as_ref());
        add("Sprint", race.sprint.as_ref());
        add("Qualifying", race.qualifying.as_ref());

        let race_start = race
            .time
            .as_deref()
            .and_then(|time| parse_start(&race.date, time));
        if let Some(start_time) = race_start {
            sessions.push(ScheduledSession {
                round,
                race_name: race.race_name.clone(),
                session_name: "Race".to_string(),
                start_time,
                duration: session_duration(),
            });
        }
    }

    sessions.sort_by_key(|s| s.start_time);
    sessions
}

/// Fetch the season calendar as a time-sorted session list
pub async fn fetch_schedule(
    http: &reqwest::Client,
    url: &str,
) -> Result<Vec<ScheduledSession>, ScheduleError> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ScheduleError::Http(format!(
            "calendar endpoint returned {}",
            response.status()
        )));
    }

    let parsed: JolpicaResponse = response
        .json()
        .await
        .map_err(|e| ScheduleError::Shape(e.to_string()))?;
    Ok(parse_calendar(parsed))
}

/// Find the next weekend to wake up for
///
/// Weekends are session groups sharing a round; a weekend ends four hours
/// after its last session to leave room for delayed archive data.
pub fn find_next_wakeup(sessions: &[ScheduledSession], now: DateTime<Utc>) -> Option<Wakeup> {
    let mut rounds: Vec<(u32, Vec<&ScheduledSession>)> = Vec::new();
    for session in sessions {
        match rounds.iter_mut().find(|(round, _)| *round == session.round) {
            Some((_, group)) => group.push(session),
            None => rounds.push((session.round, vec![session])),
        }
    }
    rounds.sort_by_key(|(_, group)| group[0].start_time);

    for (_, group) in rounds {
        let last = group.last()?;
        let weekend_end = last.start_time + last.duration + post_race_buffer();
        if now >= weekend_end {
            continue;
        }

        let first = group[0];
        let wake_time = first.start_time - wake_before();
        let sleep = (wake_time - now).to_std().unwrap_or(Duration::ZERO);

        return Some(Wakeup {
            session: first.clone(),
            sleep,
            weekend_end,
        });
    }

    None
}

/// Log the next few upcoming sessions for visibility
pub fn log_upcoming(sessions: &[ScheduledSession], count: usize) {
    let now = Utc::now();
    let upcoming: Vec<_> = sessions.iter().filter(|s| s.start_time > now).collect();

    if upcoming.is_empty() {
        log::info!("No upcoming sessions in schedule");
        return;
    }

    log::info!("Next {} sessions:", upcoming.len().min(count));
    for session in upcoming.iter().take(count) {
        let until = session.start_time - now;
        let eta = if until.num_days() > 1 {
            format!("{}d", until.num_days())
        } else {
            format!("{}h", until.num_hours())
        };
        log::info!(
            "  {} {} - {} (in {})",
            session.race_name,
            session.session_name,
            session.start_time.to_rfc3339(),
            eta
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(round: u32, name: &str, start: &str) -> ScheduledSession {
        ScheduledSession {
            round,
            race_name: format!("Round {}", round),
            session_name: name.to_string(),
            start_time: start.parse().unwrap(),
            duration: session_duration(),
        }
    }

    fn melbourne_weekend() -> Vec<ScheduledSession> {
        vec![
            session(1, "FP1", "2026-03-06T01:30:00Z"),
            session(1, "FP2", "2026-03-06T05:00:00Z"),
            session(1, "FP3", "2026-03-07T01:30:00Z"),
            session(1, "Qualifying", "2026-03-07T05:00:00Z"),
            session(1, "Race", "2026-03-08T04:00:00Z"),
            session(2, "FP1", "2026-03-13T03:30:00Z"),
            session(2, "Race", "2026-03-15T06:00:00Z"),
        ]
    }

    #[test]
    fn test_wakeup_sleeps_until_hour_before_fp1() {
        let now = "2026-03-01T00:00:00Z".parse().unwrap();
        let wakeup = find_next_wakeup(&melbourne_weekend(), now).expect("wakeup");

        assert_eq!(wakeup.session.session_name, "FP1");
        assert_eq!(wakeup.session.round, 1);
        // 1h before FP1 on March 6th 01:30
        let expected_wake: DateTime<Utc> = "2026-03-06T00:30:00Z".parse().unwrap();
        assert_eq!(now + ChronoDuration::from_std(wakeup.sleep).unwrap(), expected_wake);
    }

    #[test]
    fn test_mid_weekend_wakes_immediately() {
        // Saturday between FP3 and qualifying
        let now = "2026-03-07T03:00:00Z".parse().unwrap();
        let wakeup = find_next_wakeup(&melbourne_weekend(), now).expect("wakeup");

        assert_eq!(wakeup.session.round, 1);
        assert_eq!(wakeup.sleep, Duration::ZERO);
    }

    #[test]
    fn test_finished_weekend_moves_to_next_round() {
        // Race ended 04:00+3h, buffer 4h -> weekend over at 11:00
        let now = "2026-03-08T12:00:00Z".parse().unwrap();
        let wakeup = find_next_wakeup(&melbourne_weekend(), now).expect("wakeup");

        assert_eq!(wakeup.session.round, 2);
        assert_eq!(wakeup.session.session_name, "FP1");
    }

    #[test]
    fn test_season_over_yields_none() {
        let now = "2026-12-01T00:00:00Z".parse().unwrap();
        assert!(find_next_wakeup(&melbourne_weekend(), now).is_none());
    }

    #[test]
    fn test_weekend_end_includes_buffer() {
        let now = "2026-03-01T00:00:00Z".parse().unwrap();
        let wakeup = find_next_wakeup(&melbourne_weekend(), now).expect("wakeup");

        let expected: DateTime<Utc> = "2026-03-08T11:00:00Z".parse().unwrap();
        assert_eq!(wakeup.weekend_end, expected);
    }

    #[test]
    fn test_parse_calendar_shapes() {
        let raw = serde_json::json!({
            "MRData": {"RaceTable": {"Races": [{
                "season": "2026",
                "round": "1",
                "raceName": "Australian Grand Prix",
                "date": "2026-03-08",
                "time": "04:00:00Z",
                "FirstPractice": {"date": "2026-03-06", "time": "01:30:00Z"},
                "Qualifying": {"date": "2026-03-07", "time": "05:00:00Z"}
            }]}}
        });

        let parsed: JolpicaResponse = serde_json::from_value(raw).unwrap();
        let sessions = parse_calendar(parsed);

        // 3 pre-season test days + FP1 + Qualifying + Race
        assert_eq!(sessions.len(), 6);
        let names: Vec<_> = sessions
            .iter()
            .filter(|s| s.round == 1)
            .map(|s| s.session_name.as_str())
            .collect();
        assert_eq!(names, vec!["FP1", "Qualifying", "Race"]);
    }

    #[test]
    fn test_race_without_time_is_skipped() {
        let raw = serde_json::json!({
            "MRData": {"RaceTable": {"Races": [{
                "round": "1",
                "raceName": "TBC Grand Prix",
                "date": "2026-03-08"
            }]}}
        });

        let parsed: JolpicaResponse = serde_json::from_value(raw).unwrap();
        let sessions = parse_calendar(parsed);
        assert!(sessions.iter().all(|s| s.round == 0), "only pre-season left");
    }
}
