//! Scheduled-for parsing and the publish path decision.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use regex::Regex;
use serde::Serialize;

/// Hour used when a date is given without a time.
const DEFAULT_HOUR: u32 = 9;

static US_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([AP]M))?)?$",
    )
    .expect("valid date regex")
});

/// Dotted meridiem as spreadsheets and people write it: `p.m.`, `A.M`
static DOTTED_MERIDIEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([ap])\.\s?m\b\.?").expect("valid meridiem regex"));

const GENERIC_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%B %d %Y %I:%M %p",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%B %d %Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPath {
    /// Send to the publish webhook right away
    Immediate,
    /// Store with a future timestamp for the external scheduler
    Scheduled,
    /// Store only
    Draft,
}

/// Picks the publish path for a record.
///
/// A schedule that falls on today's calendar date in `now`'s zone is sent
/// immediately: the external scheduler polls too coarsely to fire it on time.
pub fn decide<Tz: TimeZone>(
    publish_now: bool,
    scheduled_for: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> DispatchPath {
    if publish_now {
        return DispatchPath::Immediate;
    }

    match scheduled_for {
        Some(at) if is_same_day(&at.with_timezone(&now.timezone()), now) => {
            DispatchPath::Immediate
        }
        Some(_) => DispatchPath::Scheduled,
        None => DispatchPath::Draft,
    }
}

/// [`decide`] against the host's local clock.
pub fn decide_now(publish_now: bool, scheduled_for: Option<DateTime<Utc>>) -> DispatchPath {
    decide(publish_now, scheduled_for, &Local::now())
}

fn is_same_day<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.year() == b.year() && a.month() == b.month() && a.day() == b.day()
}

/// Parses free-form scheduled-for text in `tz`.
///
/// Accepts `MM/DD/YYYY[ HH:MM[:SS][ AM|PM]]` first, then RFC 3339, a few
/// ISO-like shapes and month-name dates such as `January 20, 2025 2:00 PM`.
/// Anything else, including impossible dates and local times skipped by a DST
/// change, yields `None` so the record becomes a draft.
pub fn parse_scheduled_for_in<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let text = DOTTED_MERIDIEM.replace_all(text, |caps: &regex::Captures<'_>| {
        format!("{}M", caps[1].to_ascii_uppercase())
    });
    let text = text.as_ref();

    if let Some(naive) = parse_us_date(text) {
        return to_utc(naive, tz);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }

    for format in GENERIC_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return to_utc(naive, tz);
        }
    }

    DATE_ONLY_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(DEFAULT_HOUR, 0, 0))
        .and_then(|naive| to_utc(naive, tz))
}

/// [`parse_scheduled_for_in`] using the host's local zone.
pub fn parse_scheduled_for(text: &str) -> Option<DateTime<Utc>> {
    parse_scheduled_for_in(text, &Local)
}

fn parse_us_date(text: &str) -> Option<NaiveDateTime> {
    let caps = US_DATE.captures(text)?;
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let date = NaiveDate::from_ymd_opt(number(3)? as i32, number(1)?, number(2)?)?;

    let (mut hour, minute) = match (number(4), number(5)) {
        (Some(hour), Some(minute)) => (hour, minute),
        _ => (DEFAULT_HOUR, 0),
    };
    let second = number(6).unwrap_or(0);

    if let Some(meridiem) = caps.get(7) {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(date.and_time(time))
}

fn to_utc<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}
