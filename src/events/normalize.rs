//! Standardizes raw news items into the event schema the correlator consumes.
//!
//! Unlike the run detector, this path is best-effort: news sources are noisy,
//! so an item with an unparseable date is dropped rather than failing the
//! whole batch.

use chrono::{DateTime, NaiveDate};

use crate::core::types::{Event, RawEvent};

/// Parse, filter to the closed interval `[start, end]`, stamp the ticker,
/// sort by `(date, headline)` and keep the first `max_items`.
pub fn normalize_events(
    raw: &[RawEvent],
    start: NaiveDate,
    end: NaiveDate,
    max_items: usize,
    ticker: &str,
) -> Vec<Event> {
    let ticker = ticker.to_uppercase();
    let mut out: Vec<Event> = Vec::new();

    for item in raw {
        let Some(date) = item.date.as_deref().and_then(parse_event_date) else {
            continue;
        };
        if date < start || date > end {
            continue;
        }
        out.push(Event {
            date,
            headline: item.headline.trim().to_string(),
            source: item.source.clone(),
            url: item.url.clone(),
            summary: item.summary.clone(),
            ticker: ticker.clone(),
        });
    }

    out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.headline.cmp(&b.headline)));
    out.truncate(max_items);
    out
}

/// Accepts plain ISO dates and RFC 3339 timestamps (date part, timezone dropped).
fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    None
}
