pub mod base;
pub mod freeroll_password_html;
pub mod freerollpass_html;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Event, Source};

/// Why a single listing was skipped.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("unparsable date {0:?}")]
    InvalidDate(String),
    #[error("unparsable time {0:?}")]
    InvalidTime(String),
    #[error("offset GMT{0:+} out of range")]
    InvalidOffset(i32),
}

pub trait FreerollScraper: Send + Sync {
    fn source(&self) -> Source;
    fn url(&self) -> &'static str;

    /// Fetches and normalizes the whole page. Listings that fail to parse are
    /// skipped inside; an `Err` means the page itself could not be loaded.
    fn fetch(&self) -> anyhow::Result<Vec<Event>>;

    /// [`fetch`](Self::fetch) with whole-source failures collapsed to an empty list.
    fn scrape(&self) -> Vec<Event> {
        match self.fetch() {
            Ok(events) => {
                info!(source = self.source().id(), count = events.len(), "scraped listings");
                events
            }
            Err(err) => {
                warn!(source = self.source().id(), url = self.url(), "fetch failed: {err:#}");
                Vec::new()
            }
        }
    }
}

pub fn active_scrapers() -> Vec<Arc<dyn FreerollScraper>> {
    vec![
        Arc::new(freeroll_password_html::FreerollPassword),
        Arc::new(freerollpass_html::FreerollPass),
    ]
}

/// Runs every scraper and merges their output into one time-ordered list.
#[derive(Clone)]
pub struct Aggregator {
    scrapers: Vec<Arc<dyn FreerollScraper>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(active_scrapers())
    }
}

impl Aggregator {
    pub fn new(scrapers: Vec<Arc<dyn FreerollScraper>>) -> Self {
        Self { scrapers }
    }

    /// Each scraper runs on its own blocking task, so one slow site only
    /// delays the result up to its HTTP timeout.
    pub async fn fetch_all(&self) -> Vec<Event> {
        let handles: Vec<_> = self
            .scrapers
            .iter()
            .cloned()
            .map(|scraper| tokio::task::spawn_blocking(move || scraper.scrape()))
            .collect();

        let mut batches = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(events) => batches.push(events),
                Err(err) => warn!("scraper task failed: {err}"),
            }
        }
        merge_sorted(batches)
    }
}

/// Concatenates batches in order and stable-sorts by effective timestamp, so
/// ties keep the earlier batch first.
pub fn merge_sorted(batches: Vec<Vec<Event>>) -> Vec<Event> {
    let mut events: Vec<Event> = batches.into_iter().flatten().collect();
    events.sort_by_key(Event::effective_timestamp);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Listing;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn named(name: &str) -> Listing {
        Listing {
            name: name.to_string(),
            ..Listing::default()
        }
    }

    fn is_sorted(events: &[Event]) -> bool {
        events
            .windows(2)
            .all(|pair| pair[0].effective_timestamp() <= pair[1].effective_timestamp())
    }

    struct Fixed(Source, anyhow::Result<Vec<Event>>);

    impl FreerollScraper for Fixed {
        fn source(&self) -> Source {
            self.0
        }

        fn url(&self) -> &'static str {
            "https://example.invalid/"
        }

        fn fetch(&self) -> anyhow::Result<Vec<Event>> {
            match &self.1 {
                Ok(events) => Ok(events.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    #[test]
    fn merges_and_sorts_both_sources() {
        let a = vec![
            Event::timed(Source::FreerollPassword, at(24, 22, 0), named("a-late")),
            Event::timed(Source::FreerollPassword, at(24, 9, 0), named("a-early")),
        ];
        let b = vec![
            Event::timed(Source::FreerollPass, at(24, 12, 0), named("b-noon")),
            Event::all_day(Source::FreerollPass, at(25, 0, 0).date(), named("b-all-day")),
        ];
        let merged = merge_sorted(vec![a, b]);
        let names: Vec<_> = merged.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a-early", "b-noon", "a-late", "b-all-day"]);
        assert!(is_sorted(&merged));
    }

    #[test]
    fn ties_keep_source_order() {
        let a = vec![Event::timed(Source::FreerollPassword, at(24, 20, 0), named("first"))];
        let b = vec![Event::timed(Source::FreerollPass, at(24, 20, 0), named("second"))];
        let merged = merge_sorted(vec![a, b]);
        assert_eq!(merged[0].name, "first");
        assert_eq!(merged[1].name, "second");
    }

    #[test]
    fn tolerates_empty_sources() {
        assert!(merge_sorted(vec![Vec::new(), Vec::new()]).is_empty());
        let b = vec![
            Event::timed(Source::FreerollPass, at(24, 21, 0), named("x")),
            Event::timed(Source::FreerollPass, at(24, 20, 0), named("y")),
        ];
        let merged = merge_sorted(vec![Vec::new(), b]);
        assert_eq!(merged.len(), 2);
        assert!(is_sorted(&merged));
    }

    #[tokio::test]
    async fn failing_source_does_not_fail_the_aggregate() {
        let ok = vec![Event::timed(Source::FreerollPass, at(24, 20, 0), named("ok"))];
        let aggregator = Aggregator::new(vec![
            Arc::new(Fixed(Source::FreerollPassword, Err(anyhow::anyhow!("timed out")))),
            Arc::new(Fixed(Source::FreerollPass, Ok(ok))),
        ]);
        let events = aggregator.fetch_all().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "ok");
    }
}
