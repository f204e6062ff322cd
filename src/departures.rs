use crate::config::NaiveZone;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use std::time::Duration;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse a predicted departure time such as `2024-03-01T17:42:10.000Z`.
///
/// Timestamps without a UTC offset are read as wall-clock time in `zone`.
pub fn parse_timestamp(timestamp: &str, zone: NaiveZone) -> Result<DateTime<Utc>> {
    match zone {
        NaiveZone::Utc => parse_timestamp_in(timestamp, &Utc),
        NaiveZone::Local => parse_timestamp_in(timestamp, &Local),
    }
}

/// Like [parse_timestamp], with timestamps lacking an offset read in `tz`.
///
/// A wall-clock time skipped by a daylight saving change is an error, one that happens twice
/// resolves to the earlier instant.
pub fn parse_timestamp_in<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let timestamp = timestamp.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(timestamp) {
        return Ok(datetime.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(timestamp, NAIVE_FORMAT)
        .with_context(|| format!("Invalid departure timestamp {timestamp:?}"))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(datetime) | LocalResult::Ambiguous(datetime, _) => {
            Ok(datetime.with_timezone(&Utc))
        }
        LocalResult::None => {
            bail!("Departure timestamp {timestamp:?} falls in a daylight saving gap")
        }
    }
}

/// Whole seconds between `now` and `departure`, negative once the train has left
pub fn seconds_until(departure: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    departure.signed_duration_since(now).num_seconds()
}

/// Waits, in seconds, of the departures leaving within `horizon` of `now`
pub fn upcoming(departures: &[DateTime<Utc>], now: DateTime<Utc>, horizon: Duration) -> Vec<i64> {
    let horizon = i64::try_from(horizon.as_secs()).unwrap_or(i64::MAX);

    let mut waits = departures
        .iter()
        .map(|departure| seconds_until(*departure, now))
        .filter(|wait| (0..horizon).contains(wait))
        .collect::<Vec<_>>();
    waits.sort_unstable();
    waits
}
