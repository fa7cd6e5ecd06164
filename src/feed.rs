//! RSS 2.0 output.

use std::fs::File;
use std::io::{BufWriter, Write};

use chrono::{DateTime, FixedOffset};
use rss::{Channel, Guid, Item};
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::error::Result;
use crate::models::EventRecord;
use crate::store::PublishDateStore;
use crate::utils;

pub struct RenderedFeed {
    pub channel: Channel,
    pub new_items: usize,
}

fn build_item(event: &EventRecord, pub_date: DateTime<FixedOffset>) -> Item {
    let mut guid = Guid::default();
    guid.set_value(event.url.clone());
    guid.set_permalink(true);

    let mut item = Item::default();
    item.set_title(format!("{} {}", event.date_label(), event.title));
    item.set_link(event.url.clone());
    item.set_guid(guid);
    item.set_pub_date(pub_date.to_rfc2822());
    item.set_description(format!(
        "{}\n{}",
        event.date_time_label(),
        event.description_html
    ));
    item
}

/// Builds the channel, assigning `now` as the publish date of events the store has not
/// seen. With no events the build date is `now`.
pub fn render_feed(
    config: &FeedConfig,
    events: &[EventRecord],
    store: &mut PublishDateStore,
    now: DateTime<FixedOffset>,
) -> RenderedFeed {
    let known_before = store.len();
    let mut items = Vec::with_capacity(events.len());
    let mut last_build: Option<DateTime<FixedOffset>> = None;

    for event in events {
        let pub_date = store.get_or_assign(event, now);
        last_build = Some(match last_build {
            Some(latest) if latest >= pub_date => latest,
            _ => pub_date,
        });
        items.push(build_item(event, pub_date));
    }

    let last_build = last_build.unwrap_or_else(|| {
        warn!("no events to publish, writing an empty feed");
        now
    });

    let mut channel = Channel::default();
    channel.set_title(config.title.clone());
    channel.set_link(config.link.clone());
    channel.set_description(config.description.clone());
    channel.set_last_build_date(last_build.to_rfc2822());
    channel.set_items(items);

    RenderedFeed {
        channel,
        new_items: store.len() - known_before,
    }
}

/// Loads the store, renders, saves the store, then writes the feed file.
pub fn output_feed(
    config: &FeedConfig,
    events: &[EventRecord],
    store_path: &std::path::Path,
    now: DateTime<FixedOffset>,
) -> Result<usize> {
    let mut store = PublishDateStore::load(store_path);
    let rendered = render_feed(config, events, &mut store, now);
    store.save()?;
    info!(
        path = %store.path().display(),
        entries = store.len(),
        new = rendered.new_items,
        "saved publish dates"
    );

    utils::ensure_parent(&config.output)?;
    let writer = BufWriter::new(File::create(&config.output)?);
    let mut writer = rendered.channel.write_to(writer)?;
    writer.flush()?;
    Ok(rendered.new_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn show(slug: &str, title: &str) -> EventRecord {
        let url = format!("http://hardcore.lt/renginys/{slug}/");
        EventRecord {
            title: title.to_string(),
            url: url.clone(),
            time: offset().with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
            description_html: "<li><p>Venue X</p></li>".to_string(),
            description_text: format!("Venue X\n{url}"),
        }
    }

    fn now() -> DateTime<FixedOffset> {
        offset().with_ymd_and_hms(2024, 2, 20, 12, 0, 0).unwrap()
    }

    fn config_in(dir: &std::path::Path) -> FeedConfig {
        FeedConfig {
            output: dir.join("hcevents.xml"),
            ..FeedConfig::default()
        }
    }

    fn read_channel(config: &FeedConfig) -> Channel {
        let bytes = std::fs::read(&config.output).expect("read feed");
        Channel::read_from(&bytes[..]).expect("parse feed")
    }

    #[test]
    fn items_follow_event_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PublishDateStore::load(dir.path().join("pubdates.json"));
        let event = show("show-a", "Show A");

        let rendered = render_feed(&FeedConfig::default(), &[event.clone()], &mut store, now());
        let channel = rendered.channel;
        assert_eq!(channel.title(), "Vilnius Hardcore events");
        assert_eq!(channel.link(), "http://wemakethings.net/hcevents/");
        assert_eq!(channel.description(), "");
        assert_eq!(rendered.new_items, 1);

        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("2024-03-01 Show A"));
        assert_eq!(item.link(), Some(event.url.as_str()));
        let guid = item.guid().expect("guid");
        assert_eq!(guid.value(), event.url);
        assert!(guid.is_permalink());
        assert_eq!(
            item.description(),
            Some("2024-03-01 20:00\n<li><p>Venue X</p></li>")
        );
        assert_eq!(item.pub_date(), Some(now().to_rfc2822().as_str()));
        assert_eq!(channel.last_build_date(), Some(now().to_rfc2822().as_str()));
    }

    #[test]
    fn publish_dates_are_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let store_path = dir.path().join("pubdates.json");
        let events = vec![show("a", "A"), show("b", "B")];

        assert_eq!(output_feed(&config, &events, &store_path, now()).unwrap(), 2);
        let first = read_channel(&config);

        let later = now() + Duration::days(1);
        assert_eq!(output_feed(&config, &events, &store_path, later).unwrap(), 0);
        let second = read_channel(&config);

        let dates = |channel: &Channel| {
            channel
                .items()
                .iter()
                .map(|item| item.pub_date().map(str::to_string))
                .collect::<Vec<_>>()
        };
        assert_eq!(dates(&first), dates(&second));
        assert_eq!(first.last_build_date(), second.last_build_date());
    }

    #[test]
    fn new_event_gets_current_time_and_drives_build_date() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let store_path = dir.path().join("pubdates.json");

        output_feed(&config, &[show("a", "A")], &store_path, now()).unwrap();

        let later = now() + Duration::days(2);
        let events = vec![show("a", "A"), show("b", "B")];
        assert_eq!(output_feed(&config, &events, &store_path, later).unwrap(), 1);

        let channel = read_channel(&config);
        let items = channel.items();
        assert_eq!(items[0].pub_date(), Some(now().to_rfc2822().as_str()));
        assert_eq!(items[1].pub_date(), Some(later.to_rfc2822().as_str()));
        assert_eq!(channel.last_build_date(), Some(later.to_rfc2822().as_str()));
    }

    #[test]
    fn empty_feed_uses_render_time() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let store_path = dir.path().join("pubdates.json");

        assert_eq!(output_feed(&config, &[], &store_path, now()).unwrap(), 0);
        let channel = read_channel(&config);
        assert!(channel.items().is_empty());
        assert_eq!(channel.last_build_date(), Some(now().to_rfc2822().as_str()));
    }
}
