//! iCalendar output.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use icalendar::{Calendar, Component, Property};

use crate::config::{CalendarConfig, Zone};
use crate::error::Result;
use crate::models::EventRecord;
use crate::utils;

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Pages carry no end time. Shows are assumed to run until 04:00 wall-clock time the next
/// morning in `zone`, whatever offset that day has.
pub fn event_end(start: &DateTime<FixedOffset>, zone: Zone) -> DateTime<FixedOffset> {
    let next_day = zone.local_time(start.with_timezone(&Utc)).date_naive() + Duration::days(1);
    next_day
        .and_hms_opt(4, 0, 0)
        .and_then(|naive| zone.localize(naive))
        .unwrap_or_else(|| *start + Duration::days(1))
}

pub fn render_calendar(
    config: &CalendarConfig,
    events: &[EventRecord],
    zone: Zone,
    now: DateTime<Utc>,
) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("X-WR-CALNAME", config.name.as_str()));

    for event in events {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&event.url);
        ics_event.add_property("DTSTAMP", now.format(UTC_FORMAT).to_string());
        ics_event.add_property("DTSTART", utc_stamp(&event.time));
        ics_event.add_property("DTEND", utc_stamp(&event_end(&event.time, zone)));
        ics_event.summary(&event.title);
        ics_event.description(&event.description_text);

        let mut alt = Property::new("X-ALT-DESC", event.description_html.as_str());
        alt.add_parameter("FMTTYPE", "text/html");
        ics_event.append_property(alt);

        cal.push(ics_event.done());
    }

    set_prodid(&cal.done().to_string(), &config.prodid)
}

pub fn output_calendar(
    config: &CalendarConfig,
    events: &[EventRecord],
    zone: Zone,
    now: DateTime<Utc>,
) -> Result<()> {
    write_file(&config.output, render_calendar(config, events, zone, now).as_bytes())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    utils::ensure_parent(path)?;
    fs::write(path, contents)?;
    Ok(())
}

fn utc_stamp(time: &DateTime<FixedOffset>) -> String {
    time.with_timezone(&Utc).format(UTC_FORMAT).to_string()
}

/// The icalendar crate always writes its own PRODID.
fn set_prodid(ics: &str, prodid: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(prodid);
        } else {
            result.push_str(line);
        }
        result.push_str("\r\n");
    }
    result
}
