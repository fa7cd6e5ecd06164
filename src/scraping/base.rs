use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Selector};

use crate::config::{AppConfig, Zone};
use crate::error::{AppError, Result};

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?\s+").expect("valid weekday regex")
});
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(–|—|\s-\s).*$").expect("valid range regex"));
static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?P<day>\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex")
});
// `20:00`, `8:00 pm`, `T20:00:00` at the end of a label.
static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[\sT])(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?(?:\s*(?i:(?P<meridiem>[ap])\.?m\.?))?$",
    )
    .expect("valid clock regex")
});
// `8pm`, `8 pm`.
static HOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)(?P<hour>\d{1,2})\s*(?i:(?P<meridiem>[ap])\.?m\.?)$")
        .expect("valid hour regex")
});

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

// Parsed with the reference year appended.
const YEARLESS_FORMATS: [&str; 4] = ["%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M %z", "%Y-%m-%d %H:%M:%S %z"];

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text with line structure kept, each line trimmed and blank lines dropped.
pub fn block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_selector(name: &'static str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::Selector {
        name,
        selector: selector.to_string(),
    })
}

pub fn absolute_url(base: &str, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(href).ok().map(|u| u.to_string())
}

pub fn http_client(config: &AppConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());
    builder = match config.request_timeout_secs {
        Some(secs) => builder.timeout(Duration::from_secs(secs)),
        None => builder.timeout(None::<Duration>),
    };
    builder.build().map_err(|source| AppError::Http {
        url: config.source_url.clone(),
        source,
    })
}

pub fn fetch_html(client: &Client, url: &str) -> Result<String> {
    let wrap = |source: reqwest::Error| AppError::Http {
        url: url.to_string(),
        source,
    };
    client
        .get(url)
        .send()
        .map_err(wrap)?
        .error_for_status()
        .map_err(wrap)?
        .text()
        .map_err(wrap)
}

/// Parses an event time label such as `2024-03-01 20:00`, `March 1st, 2024 8pm` or
/// `Saturday, March 1 @ 8:00 pm – 11:00 pm`. Labels without an explicit offset are
/// localized to `zone`. Labels without a year take the year of `today`, or the next one if
/// that date has already passed; a bare time of day falls on `today`.
pub fn parse_time_label(label: &str, zone: Zone, today: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let normalized = normalize_label(label);
    let fail = || AppError::TimeLabel(label.to_string());
    if normalized.is_empty() {
        return Err(fail());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt);
        }
    }

    let naive = parse_naive(&normalized, today).ok_or_else(fail)?;
    zone.localize(naive).ok_or_else(fail)
}

fn normalize_label(label: &str) -> String {
    let cleaned = clean_text(&label.replace(|c: char| matches!(c, '@' | ','), " "));
    let cleaned = WEEKDAY_RE.replace(&cleaned, "");
    let cleaned = RANGE_RE.replace(&cleaned, "");
    clean_text(&ORDINAL_RE.replace_all(&cleaned, "${day}"))
}

fn parse_naive(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let (date_text, time) = match split_clock(text) {
        Some((date_text, time)) => (date_text, time?),
        None => (text, NaiveTime::from_hms_opt(0, 0, 0)?),
    };
    let date = if date_text.is_empty() {
        today
    } else {
        parse_date(date_text, today)?
    };
    Some(date.and_time(time))
}

/// Splits a trailing time of day off `text`. The time is `None` when it is out of range.
fn split_clock(text: &str) -> Option<(&str, Option<NaiveTime>)> {
    let caps = CLOCK_RE.captures(text).or_else(|| HOUR_RE.captures(text))?;
    let start = caps.get(0)?.start();
    let number = |name: &str| {
        caps.name(name)
            .map_or(Some(0), |m| m.as_str().parse::<u32>().ok())
    };
    let time = match (number("hour"), number("minute"), number("second")) {
        (Some(hour), Some(minute), Some(second)) => {
            clock_time(hour, minute, second, caps.name("meridiem").map(|m| m.as_str()))
        }
        _ => None,
    };
    Some((text[..start].trim(), time))
}

fn clock_time(hour: u32, minute: u32, second: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour = match meridiem {
        None => hour,
        Some(_) if !(1..=12).contains(&hour) => return None,
        Some(m) if m.eq_ignore_ascii_case("p") => hour % 12 + 12,
        Some(_) => hour % 12,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }

    let with_year = format!("{} {}", text, today.year());
    for fmt in YEARLESS_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, fmt) {
            if date >= today {
                return Some(date);
            }
            return date.with_year(today.year() + 1);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn vilnius() -> Zone {
        Zone::Named(chrono_tz::Europe::Vilnius)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 15).expect("valid date")
    }

    #[test]
    fn parses_iso_label_in_configured_zone() {
        let dt = parse_time_label(" 2024-03-01  20:00 ", vilnius(), today()).expect("parse");
        assert_eq!(dt.to_rfc3339(), "2024-03-01T20:00:00+02:00");
    }

    #[test]
    fn keeps_explicit_offset() {
        let dt = parse_time_label("2024-03-01T20:00:00+05:00", vilnius(), today()).expect("parse");
        assert_eq!(dt.offset().local_minus_utc(), 5 * 3600);
    }

    #[test]
    fn parses_calendar_plugin_label_with_range() {
        let dt = parse_time_label("Saturday, March 2, 2024 @ 8:00 pm – 11:00 pm", vilnius(), today())
            .expect("parse");
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(dt.hour(), 20);
    }

    #[test]
    fn infers_year_for_yearless_labels() {
        let upcoming = parse_time_label("March 1 @ 19:30", vilnius(), today()).expect("parse");
        assert_eq!(upcoming.year(), 2024);
        assert_eq!(upcoming.minute(), 30);

        let rolled = parse_time_label("Jan 10 @ 7:00 pm", vilnius(), today()).expect("parse");
        assert_eq!(rolled.year(), 2025);
        assert_eq!(rolled.hour(), 19);
    }

    #[test]
    fn date_only_label_means_midnight() {
        let dt = parse_time_label("2024-03-01", vilnius(), today()).expect("parse");
        assert_eq!((dt.hour(), dt.minute()), (0, 0));
    }

    fn local(label: &str) -> String {
        parse_time_label(label, vilnius(), today())
            .unwrap_or_else(|err| panic!("{label}: {err}"))
            .to_rfc3339()
    }

    #[test]
    fn bare_time_falls_on_today() {
        assert_eq!(local("8:00 pm"), "2024-02-15T20:00:00+02:00");
        assert_eq!(local("20:00"), "2024-02-15T20:00:00+02:00");
        assert_eq!(local("12:30 am"), "2024-02-15T00:30:00+02:00");
    }

    #[test]
    fn iso_date_with_twelve_hour_clock() {
        assert_eq!(local("2024-03-01 8:00 pm"), "2024-03-01T20:00:00+02:00");
    }

    #[test]
    fn day_before_month_name() {
        assert_eq!(local("1 March 2024 20:00"), "2024-03-01T20:00:00+02:00");
    }

    #[test]
    fn ordinal_day_and_hour_only_meridiem() {
        assert_eq!(local("March 1st, 2024 8pm"), "2024-03-01T20:00:00+02:00");
        assert_eq!(local("Sat, Mar 2nd @ 9 PM"), "2024-03-02T21:00:00+02:00");
    }

    #[test]
    fn slash_separated_date() {
        assert_eq!(local("2024/03/01 20:00"), "2024-03-01T20:00:00+02:00");
    }

    #[test]
    fn out_of_range_clock_is_rejected() {
        assert!(parse_time_label("2024-03-01 13:00 pm", vilnius(), today()).is_err());
        assert!(parse_time_label("2024-03-01 25:00", vilnius(), today()).is_err());
    }

    #[test]
    fn rejects_garbage_and_dst_gaps() {
        assert!(matches!(
            parse_time_label("sometime soon", vilnius(), today()),
            Err(AppError::TimeLabel(_))
        ));
        assert!(parse_time_label("", vilnius(), today()).is_err());
        // Vilnius skips 03:00-04:00 on 2024-03-31.
        assert!(parse_time_label("2024-03-31 03:30", vilnius(), today()).is_err());
    }

    #[test]
    fn resolves_relative_links() {
        assert_eq!(
            absolute_url("http://hardcore.lt", Some("/renginys/show-a/")).as_deref(),
            Some("http://hardcore.lt/renginys/show-a/")
        );
        assert_eq!(
            absolute_url("http://hardcore.lt", Some("https://example.com/x")).as_deref(),
            Some("https://example.com/x")
        );
        assert_eq!(absolute_url("http://hardcore.lt", Some("  ")), None);
    }
}
