use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{EstuaryError, Result};
use crate::domain::ContentItem;

/// Zone-less layouts tried after RFC 2822 and RFC 3339, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y"];

/// Turns raw RSS/Atom/JSON Feed documents into [`ContentItem`]s.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse `body` and emit every usable entry, in feed order.
    ///
    /// Entries without a title or link are dropped. Dates are not filtered
    /// here; see [`FeedFetcher`](crate::fetcher::FeedFetcher).
    pub fn normalize(&self, source: &str, body: &[u8]) -> Result<Vec<ContentItem>> {
        let feed = parser::Builder::new()
            .timestamp_parser(parse_timestamp)
            .build()
            .parse(body)
            .map_err(|e| EstuaryError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .filter_map(|entry| self.to_item(source, entry))
            .collect();

        Ok(items)
    }

    fn to_item(&self, source: &str, entry: Entry) -> Option<ContentItem> {
        let title = entry
            .title
            .as_ref()
            .map(|t| decode_html_entities(&t.content).to_string())
            .unwrap_or_default();
        let url = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        let published_date = resolve_date(&entry);
        if published_date.is_none() {
            tracing::warn!(
                "Could not parse date for entry: {}",
                if title.is_empty() { "Unknown" } else { &title }
            );
        }

        let summary = entry
            .summary
            .map(|s| decode_html_entities(&s.content).to_string())
            .filter(|s| !s.trim().is_empty());
        let description = entry
            .content
            .and_then(|c| c.body)
            .map(|b| decode_html_entities(&b).to_string())
            .filter(|b| !b.trim().is_empty());

        let content = assemble_content(summary, description, &title);

        ContentItem::new(title, url, content, source, published_date)
    }
}

/// First parseable candidate wins: `published`, then `updated`.
///
/// Both fields have already been through [`parse_timestamp`] by feed-rs, so a
/// value that matched none of the known layouts arrives here as `None`.
fn resolve_date(entry: &Entry) -> Option<DateTime<Utc>> {
    entry.published.or(entry.updated)
}

/// Summary first; the description follows after a blank line only when it
/// adds something. Falls back to the title when both are missing.
fn assemble_content(summary: Option<String>, description: Option<String>, title: &str) -> String {
    match (summary, description) {
        (Some(summary), Some(description)) if summary != description => {
            format!("{}\n\n{}", summary, description)
        }
        (Some(summary), _) => summary,
        (None, Some(description)) => description,
        (None, None) => title.to_string(),
    }
}

/// Lenient timestamp parsing installed into feed-rs.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
