//! Org timestamp values.
//!
//! Three flavors appear in archives: plain timestamps (`SCHEDULED:`,
//! `DEADLINE:`, `CLOSED:`, and inline stamps), clock entries, and the
//! state-change records left behind by repeating tasks. All of them order by
//! their start instant.

use std::fmt;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// A timestamp such as `<2024-03-01 Fri>` or `[2024-03-01 Fri 10:30]`.
///
/// `active` distinguishes `<...>` from `[...]`. `has_time` tracks whether the
/// stamp carried a clock time; date-only stamps sit at midnight internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgDate {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub active: bool,
    pub has_time: bool,
}

impl OrgDate {
    pub fn new(start: NaiveDateTime, end: Option<NaiveDateTime>, active: bool) -> Self {
        Self {
            start,
            end,
            active,
            has_time: start.time() != NaiveTime::MIN,
        }
    }

    /// Parse one timestamp, including `--` ranges and `HH:MM-HH:MM` spans.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some((first, second)) = text.split_once("--") {
            let start = parse_single(first.trim())?;
            let end = parse_single(second.trim())?;
            return Some(Self {
                start: start.start,
                end: Some(end.start),
                active: start.active,
                has_time: start.has_time,
            });
        }
        parse_single(text)
    }

    /// Find the first timestamp anywhere inside a line of text.
    pub fn scan(text: &str) -> Option<Self> {
        let re = scan_regex();
        let found = re.find(text)?;
        Self::parse(found.as_str())
    }
}

impl fmt::Display for OrgDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_stamp(f, self.start, self.active, self.has_time)?;
        if let Some(end) = self.end {
            write!(f, "--")?;
            format_stamp(f, end, self.active, self.has_time)?;
        }
        Ok(())
    }
}

/// A `CLOCK:` entry. Clock stamps are inactive and always carry times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgDateClock {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub active: bool,
}

impl OrgDateClock {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, active: bool) -> Self {
        Self { start, end, active }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl fmt::Display for OrgDateClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_stamp(f, self.start, self.active, true)?;
        write!(f, "--")?;
        format_stamp(f, self.end, self.active, true)
    }
}

/// A repeater state change such as `- State "DONE" from "TODO" [ts]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgDateRepeatedTask {
    pub timestamp: NaiveDateTime,
    pub before: Option<String>,
    pub after: Option<String>,
    pub active: bool,
}

impl OrgDateRepeatedTask {
    pub fn new(
        timestamp: NaiveDateTime,
        before: Option<String>,
        after: Option<String>,
        active: bool,
    ) -> Self {
        Self {
            timestamp,
            before,
            after,
            active,
        }
    }
}

impl fmt::Display for OrgDateRepeatedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_stamp(f, self.timestamp, self.active, true)
    }
}

fn format_stamp(
    f: &mut fmt::Formatter<'_>,
    instant: NaiveDateTime,
    active: bool,
    has_time: bool,
) -> fmt::Result {
    let (open, close) = if active { ('<', '>') } else { ('[', ']') };
    let day = instant.format("%Y-%m-%d %a");
    if has_time {
        write!(f, "{}{} {}{}", open, day, instant.format("%H:%M"), close)
    } else {
        write!(f, "{}{}{}", open, day, close)
    }
}

fn stamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^([<\[])(\d{4})-(\d{1,2})-(\d{1,2})(?:\s+[A-Za-z.]+)?(?:\s+(\d{1,2}):(\d{2})(?:-(\d{1,2}):(\d{2}))?)?[>\]]$",
        )
        .expect("timestamp pattern is valid")
    })
}

fn scan_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[<\[]\d{4}-\d{1,2}-\d{1,2}[^>\]]*[>\]](?:--[<\[]\d{4}-\d{1,2}-\d{1,2}[^>\]]*[>\]])?",
        )
        .expect("timestamp scan pattern is valid")
    })
}

fn parse_single(text: &str) -> Option<OrgDate> {
    let captures = stamp_regex().captures(text)?;
    let active = &captures[1] == "<";
    let year: i32 = captures[2].parse().ok()?;
    let month: u32 = captures[3].parse().ok()?;
    let day: u32 = captures[4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (start_time, has_time) = match (captures.get(5), captures.get(6)) {
        (Some(h), Some(m)) => {
            let time = NaiveTime::from_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, 0)?;
            (time, true)
        }
        _ => (NaiveTime::MIN, false),
    };

    let end = match (captures.get(7), captures.get(8)) {
        (Some(h), Some(m)) => {
            let time = NaiveTime::from_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, 0)?;
            Some(NaiveDateTime::new(date, time))
        }
        _ => None,
    };

    Some(OrgDate {
        start: NaiveDateTime::new(date, start_time),
        end,
        active,
        has_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_active_date() {
        let parsed = OrgDate::parse("<2024-03-01 Fri>").unwrap();
        assert!(parsed.active);
        assert!(!parsed.has_time);
        assert_eq!(parsed.start.date(), date(2024, 3, 1));
        assert_eq!(parsed.end, None);
    }

    #[test]
    fn test_parse_inactive_datetime() {
        let parsed = OrgDate::parse("[2024-03-01 Fri 10:30]").unwrap();
        assert!(!parsed.active);
        assert!(parsed.has_time);
        assert_eq!(parsed.start.time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_without_weekday() {
        let parsed = OrgDate::parse("<2024-03-01>").unwrap();
        assert_eq!(parsed.start.date(), date(2024, 3, 1));
    }

    #[test]
    fn test_parse_time_span() {
        let parsed = OrgDate::parse("<2024-03-01 Fri 10:00-12:00>").unwrap();
        let end = parsed.end.unwrap();
        assert_eq!(end.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(end.date(), date(2024, 3, 1));
    }

    #[test]
    fn test_parse_double_stamp_range() {
        let parsed = OrgDate::parse("<2024-03-01 Fri>--<2024-03-03 Sun>").unwrap();
        assert_eq!(parsed.end.unwrap().date(), date(2024, 3, 3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(OrgDate::parse("tomorrow").is_none());
        assert!(OrgDate::parse("<2024-03>").is_none());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["<2024-03-01 Fri>", "[2024-03-01 Fri 10:30]"] {
            let parsed = OrgDate::parse(text).unwrap();
            assert_eq!(parsed.to_string(), text);
        }
    }

    #[test]
    fn test_scan_inside_line() {
        let found = OrgDate::scan("SCHEDULED: <2024-03-01 Fri> DEADLINE: <2024-04-01 Mon>").unwrap();
        assert_eq!(found.start.date(), date(2024, 3, 1));
    }

    #[test]
    fn test_clock_duration() {
        let start = NaiveDateTime::new(date(2024, 3, 1), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let end = NaiveDateTime::new(date(2024, 3, 1), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        let clock = OrgDateClock::new(start, end, false);
        assert_eq!(clock.duration_minutes(), 90);
    }
}
