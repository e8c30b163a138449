use anyhow::Result;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::base;
use super::{FreerollScraper, ItemError};
use crate::models::{Event, Listing, Source, PASSWORD_NOT_REQUIRED};

const URL: &str = "https://freerollpass.com/";
const SOURCE: Source = Source::FreerollPass;
const DATE_FORMATS: [&str; 2] = ["%d.%m.%Y", "%m/%d/%Y"];
const SERVER_CLOCK_FORMAT: &str = "%d.%m.%Y %H:%M";

static SERVER_TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.loader-time #utime").expect("freerollpass server time"));
static SERVER_DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.loader-time #udate").expect("freerollpass server date"));
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul#freerollList li.row").expect("freerollpass row"));
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-4 div.f-size-30-576-40").expect("freerollpass time"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-4 div.f-size-15-576-20").expect("freerollpass date"));
static PRIZE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-4 div.c-yellow").expect("freerollpass prize"));
static ROOM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-8 div.title-room a").expect("freerollpass room"));
static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-8 span.fl-text-name").expect("freerollpass name"));
static PASSWORD_BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-8 div[id]").expect("freerollpass password block"));
static PASSWORD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("strong.c-red-1").expect("freerollpass password"));
static BADGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.fl-badge").expect("freerollpass badge"));

/// Listings in the site's own clock; the page header shows that clock so the
/// offset can be derived once per page load.
pub struct FreerollPass;

impl FreerollScraper for FreerollPass {
    fn source(&self) -> Source {
        SOURCE
    }

    fn url(&self) -> &'static str {
        URL
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(URL)?;
        Ok(self.parse_document(&html, base::destination_now()))
    }
}

impl FreerollPass {
    pub(crate) fn parse_document(&self, html: &str, destination_now: NaiveDateTime) -> Vec<Event> {
        let document = Html::parse_document(html);
        let offset_hours = page_offset_hours(&document, destination_now);

        let mut events = Vec::new();
        for row in document.select(&ROW_SELECTOR) {
            match parse_row(&row, offset_hours) {
                Ok(event) => events.push(event),
                Err(err) => warn!(source = SOURCE.id(), "skipping listing: {err}"),
            }
        }
        events
    }
}

fn page_offset_hours(document: &Html, destination_now: NaiveDateTime) -> i32 {
    let root = document.root_element();
    let server_now = base::first_text(&root, &SERVER_DATE_SELECTOR)
        .zip(base::first_text(&root, &SERVER_TIME_SELECTOR))
        .and_then(|(date, time)| {
            NaiveDateTime::parse_from_str(&format!("{date} {time}"), SERVER_CLOCK_FORMAT).ok()
        });

    match server_now {
        Some(server_now) => {
            let offset = base::server_offset_hours(server_now, destination_now);
            info!(
                source = SOURCE.id(),
                offset,
                server_time = %server_now,
                destination_time = %destination_now.format("%Y-%m-%d %H:%M"),
                "detected page timezone"
            );
            offset
        }
        None => {
            debug!(source = SOURCE.id(), "server clock unavailable, assuming destination offset");
            base::DESTINATION_OFFSET_HOURS
        }
    }
}

fn parse_row(row: &ElementRef<'_>, offset_hours: i32) -> Result<Event, ItemError> {
    let time_text =
        base::first_text(row, &TIME_SELECTOR).ok_or(ItemError::MissingField("time"))?;
    let prize = base::first_text(row, &PRIZE_SELECTOR).ok_or(ItemError::MissingField("prize"))?;
    let date_text =
        base::first_text(row, &DATE_SELECTOR).ok_or(ItemError::MissingField("date"))?;

    let date = base::parse_date(&date_text, &DATE_FORMATS)
        .ok_or_else(|| ItemError::InvalidDate(date_text.clone()))?;
    let time = base::parse_time(&time_text).ok_or_else(|| ItemError::InvalidTime(time_text.clone()))?;
    let start = base::to_destination(date.and_time(time), offset_hours)
        .ok_or(ItemError::InvalidOffset(offset_hours))?;

    let defaults = Listing::default();
    let listing = Listing {
        room: base::first_text(row, &ROOM_SELECTOR).unwrap_or(defaults.room),
        name: base::first_text(row, &NAME_SELECTOR).unwrap_or(defaults.name),
        prize,
        password: password(row).unwrap_or(defaults.password),
    };

    Ok(Event::timed(SOURCE, start, listing))
}

/// The password block is the first `div[id]` in the info column. It holds
/// either the password itself or a "not required" badge.
fn password(row: &ElementRef<'_>) -> Option<String> {
    let block = row.select(&PASSWORD_BLOCK_SELECTOR).next()?;
    if !base::inner_text(block).contains("Password") {
        return None;
    }
    if let Some(password) = base::first_text(&block, &PASSWORD_SELECTOR) {
        return Some(password);
    }
    base::first_text(&block, &BADGE_SELECTOR)
        .filter(|badge| badge.contains(PASSWORD_NOT_REQUIRED))
        .map(|_| PASSWORD_NOT_REQUIRED.to_string())
}
