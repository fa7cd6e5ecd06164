use std::collections::HashSet;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::base;
use crate::config::{Selectors, Zone};
use crate::error::Result;
use crate::models::EventRecord;

/// Extracts events from pages rendered by the All-in-One Event Calendar plugin:
///
/// ```html
/// <ol class="ai1ec-date-events">
///   <li class="ai1ec-date"><a href="...">Title</a> <span class="ai1ec-event-time">...</span></li>
///   <li>description</li>
/// </ol>
/// ```
pub struct Ai1ecExtractor {
    base_url: String,
    zone: Zone,
    today: NaiveDate,
    container: Selector,
    date_item: Selector,
    link: Selector,
    time_label: Selector,
}

impl Ai1ecExtractor {
    /// `today` anchors year inference for labels that omit the year.
    pub fn new(selectors: &Selectors, base_url: &str, zone: Zone, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            zone,
            today,
            container: base::parse_selector("container", &selectors.container)?,
            date_item: base::parse_selector("date item", &selectors.date_item)?,
            link: base::parse_selector("link", &selectors.link)?,
            time_label: base::parse_selector("time label", &selectors.time_label)?,
        })
    }

    /// Events in document order. Blocks without a link or time label are skipped; a time
    /// label that cannot be parsed fails the whole extraction.
    pub fn extract(&self, html: &str) -> Result<Vec<EventRecord>> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();
        let mut seen = HashSet::new();

        for (index, container) in document.select(&self.container).enumerate() {
            let Some(event) = self.parse_block(index, container)? else {
                continue;
            };
            if !seen.insert(event.url.clone()) {
                debug!(url = %event.url, "dropping duplicate listing");
                continue;
            }
            events.push(event);
        }

        Ok(events)
    }

    fn parse_block(&self, index: usize, container: ElementRef<'_>) -> Result<Option<EventRecord>> {
        let date_item = match child_matching(container, &self.date_item) {
            Some(el) => el,
            None => {
                warn!(block = index, "skipping event block without a date item");
                return Ok(None);
            }
        };
        let link = match child_matching(date_item, &self.link) {
            Some(el) => el,
            None => {
                warn!(block = index, "skipping event block without a link");
                return Ok(None);
            }
        };
        let url = match base::absolute_url(&self.base_url, link.value().attr("href")) {
            Some(url) => url,
            None => {
                warn!(block = index, "skipping event block with an unusable link");
                return Ok(None);
            }
        };
        let label = match container.select(&self.time_label).next() {
            Some(el) => el.text().collect::<String>(),
            None => {
                warn!(block = index, %url, "skipping event block without a time label");
                return Ok(None);
            }
        };
        let time = base::parse_time_label(&label, self.zone, self.today)?;

        let description: Vec<ElementRef<'_>> =
            date_item.next_siblings().filter_map(ElementRef::wrap).collect();
        let description_html = description
            .iter()
            .map(|el| el.html())
            .collect::<String>()
            .trim()
            .to_string();
        let body = description
            .iter()
            .map(|el| base::block_text(*el))
            .collect::<Vec<_>>()
            .join("\n");
        let body = body.trim();
        let description_text = if body.is_empty() {
            url.clone()
        } else {
            format!("{body}\n{url}")
        };

        let mut title = base::inner_text(link);
        if title.is_empty() {
            title = description_text.lines().next().unwrap_or_default().to_string();
        }

        debug!(%url, %time, "extracted event");
        Ok(Some(EventRecord {
            title,
            url,
            time,
            description_html,
            description_text,
        }))
    }
}

fn child_matching<'a>(parent: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| selector.matches(child))
}
