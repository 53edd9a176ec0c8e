use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Timelike};
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

use crate::constants::{FETCH_TIMEOUT_SECS, TIME_PATTERN};
use crate::types::FetchedTimes;

/// Fetch today's prayer times from the configured endpoint.
///
/// The endpoint returns free-form text; there is no wire contract beyond
/// "time-of-day tokens appear somewhere in the body". Each prayer gets the
/// first token whose hour falls inside its configured range, or None when
/// nothing matches.
pub async fn fetch_prayer_times(
    client: &Client,
    url: &str,
    dhuhr_hours: [u32; 2],
    maghrib_hours: [u32; 2],
) -> Result<FetchedTimes> {
    let body = client
        .get(url)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .send()
        .await
        .context("Failed to reach prayer-times endpoint")?
        .text()
        .await
        .context("Failed to read prayer-times response body")?;

    let pattern = Regex::new(TIME_PATTERN).context("Compiling time pattern")?;
    Ok(extract_times(
        &pattern,
        &body,
        Local::now().date_naive(),
        dhuhr_hours,
        maghrib_hours,
    ))
}

fn parse_time_token(token: &str) -> Option<NaiveTime> {
    for fmt in ["%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(token, fmt) {
            return Some(t);
        }
    }
    None
}

/// Scan `text` for time-of-day tokens and assign them to prayers by hour
/// range. A prayer with no in-range token yields None, never an error.
pub fn extract_times(
    pattern: &Regex,
    text: &str,
    today: NaiveDate,
    dhuhr_hours: [u32; 2],
    maghrib_hours: [u32; 2],
) -> FetchedTimes {
    let tokens: Vec<NaiveTime> = pattern
        .find_iter(text)
        .filter_map(|m| parse_time_token(m.as_str()))
        .collect();

    let pick = |range: [u32; 2]| {
        tokens
            .iter()
            .find(|t| t.hour() >= range[0] && t.hour() <= range[1])
            .and_then(|t| Local.from_local_datetime(&today.and_time(*t)).single())
    };

    FetchedTimes {
        dhuhr: pick(dhuhr_hours),
        maghrib: pick(maghrib_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn pattern() -> Regex {
        Regex::new(TIME_PATTERN).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_extracts_first_in_range_token_per_prayer() {
        let body = "Fajr 05:12:44 Sunrise 06:38:10 Dhuhr 12:14:03 Sunset 18:05:52 Maghrib 18:23:40";
        let times = extract_times(&pattern(), body, day(), [10, 15], [16, 21]);
        let dhuhr = times.dhuhr.unwrap();
        assert_eq!((dhuhr.hour(), dhuhr.minute(), dhuhr.second()), (12, 14, 3));
        // 18:05 (sunset) comes before 18:23 and is also in range
        let maghrib = times.maghrib.unwrap();
        assert_eq!((maghrib.hour(), maghrib.minute()), (18, 5));
    }

    #[test]
    fn test_handles_times_without_seconds() {
        let times = extract_times(&pattern(), "azan: 13:01 and 19:45", day(), [10, 15], [16, 21]);
        let dhuhr = times.dhuhr.unwrap();
        assert_eq!((dhuhr.hour(), dhuhr.minute(), dhuhr.second()), (13, 1, 0));
        assert_eq!(times.maghrib.unwrap().minute(), 45);
    }

    #[test]
    fn test_no_match_yields_none() {
        let times = extract_times(&pattern(), "cloudy with a chance of rain", day(), [10, 15], [16, 21]);
        assert!(times.dhuhr.is_none());
        assert!(times.maghrib.is_none());
    }

    #[test]
    fn test_out_of_range_tokens_are_ignored() {
        // only early-morning times present
        let times = extract_times(&pattern(), "04:30:00 06:15:00", day(), [10, 15], [16, 21]);
        assert!(times.dhuhr.is_none());
        assert!(times.maghrib.is_none());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let times = extract_times(&pattern(), "10:00 21:59", day(), [10, 15], [16, 21]);
        assert_eq!(times.dhuhr.unwrap().hour(), 10);
        assert_eq!(times.maghrib.unwrap().hour(), 21);
    }

    #[test]
    fn test_invalid_tokens_are_not_matched() {
        // 25:00 and 13:75 are not times of day
        let times = extract_times(&pattern(), "25:00 13:75", day(), [10, 15], [16, 21]);
        assert!(times.dhuhr.is_none());
        assert!(times.maghrib.is_none());
    }

    #[test]
    fn test_result_lands_on_requested_date() {
        let times = extract_times(&pattern(), "12:30:00", day(), [10, 15], [16, 21]);
        assert_eq!(times.dhuhr.unwrap().date_naive().day(), 1);
    }
}
