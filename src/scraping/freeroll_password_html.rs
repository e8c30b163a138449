use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::base;
use super::{FreerollScraper, ItemError};
use crate::models::{Event, Listing, Source};

const URL: &str = "https://www.freeroll-password.com/";
const SOURCE: Source = Source::FreerollPassword;
const DATE_FORMATS: [&str; 3] = ["%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

static WRAPPER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.pt-cv-wrapper").expect("freeroll-password wrapper"));
static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pt-cv-content-item").expect("freeroll-password item"));
static EXCERPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".fpexcerpt").expect("freeroll-password excerpt"));
static ROOM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".exroom").expect("freeroll-password room"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".date-display-single").expect("freeroll-password date"));
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".extime").expect("freeroll-password time"));
static PRIZE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".exprize").expect("freeroll-password prize"));
static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".exname").expect("freeroll-password name"));
static PASSWORD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".expass2").expect("freeroll-password password"));

/// Listings whose time carries its own `GMT+N` offset.
pub struct FreerollPassword;

impl FreerollScraper for FreerollPassword {
    fn source(&self) -> Source {
        SOURCE
    }

    fn url(&self) -> &'static str {
        URL
    }

    fn fetch(&self) -> Result<Vec<Event>> {
        let html = base::fetch_html(URL)?;
        Ok(self.parse_document(&html))
    }
}

impl FreerollPassword {
    pub(crate) fn parse_document(&self, html: &str) -> Vec<Event> {
        let document = Html::parse_document(html);
        let Some(wrapper) = document.select(&WRAPPER_SELECTOR).next() else {
            debug!(source = SOURCE.id(), "listing wrapper not found");
            return Vec::new();
        };

        let mut events = Vec::new();
        for item in wrapper.select(&ITEM_SELECTOR) {
            match parse_item(&item) {
                Ok(event) => events.push(event),
                Err(err) => warn!(source = SOURCE.id(), "skipping listing: {err}"),
            }
        }
        events
    }
}

fn parse_item(item: &ElementRef<'_>) -> Result<Event, ItemError> {
    let excerpt = item
        .select(&EXCERPT_SELECTOR)
        .next()
        .ok_or(ItemError::MissingField("excerpt"))?;

    let defaults = Listing::default();
    let mut listing = Listing {
        room: base::sibling_text(&excerpt, &ROOM_SELECTOR).unwrap_or(defaults.room),
        name: base::sibling_text(&excerpt, &NAME_SELECTOR).unwrap_or(defaults.name),
        prize: base::sibling_text(&excerpt, &PRIZE_SELECTOR).unwrap_or(defaults.prize),
        password: base::first_text(&excerpt, &PASSWORD_SELECTOR).unwrap_or(defaults.password),
    };

    let date_text =
        base::first_text(&excerpt, &DATE_SELECTOR).ok_or(ItemError::MissingField("date"))?;
    let date = base::parse_date(&date_text, &DATE_FORMATS)
        .ok_or_else(|| ItemError::InvalidDate(date_text.clone()))?;

    let Some(time_text) = base::sibling_text(&excerpt, &TIME_SELECTOR) else {
        return Ok(Event::all_day(SOURCE, date, listing));
    };

    match determine_start(date, &time_text) {
        Some(start) => Ok(Event::timed(SOURCE, start, listing)),
        None => {
            debug!(source = SOURCE.id(), time = %time_text, "unparsable time, keeping as all-day");
            listing.name = format!("{} ({})", listing.name, time_text);
            Ok(Event::all_day(SOURCE, date, listing))
        }
    }
}

/// `22:30 GMT+2` on `date`, converted to destination time.
fn determine_start(date: NaiveDate, time_text: &str) -> Option<NaiveDateTime> {
    let offset_hours = base::parse_gmt_offset(time_text);
    let clock = time_text.split_whitespace().next()?;
    let time = base::parse_time(clock)?;
    base::to_destination(date.and_time(time), offset_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn item(room: &str, date: &str, time: Option<&str>, name: &str, password: &str) -> String {
        let time_line = time
            .map(|t| format!(r#"<span class="extime">Time:</span> {t}<br>"#))
            .unwrap_or_default();
        format!(
            r#"
            <div class="pt-cv-content-item">
                <div class="fpexcerpt">
                    <span class="exroom">Room:</span> {room}<br>
                    <span class="date-display-single">{date}</span><br>
                    {time_line}
                    <span class="exprize">Prize:</span> $100<br>
                    <span class="exname">Name:</span> {name}<br>
                    <span class="exlabel">Password:</span> <span class="expass2">{password}</span>
                </div>
            </div>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!(
            r#"<html><body><div class="pt-cv-wrapper">{}</div></body></html>"#,
            items.join("\n")
        )
    }

    #[test]
    fn converts_listing_offset_to_destination() {
        let html = page(&[item(
            "PokerStars",
            "November 24, 2025",
            Some("22:30 GMT+2"),
            "Daily Freeroll",
            "abc123",
        )]);
        let events = FreerollPassword.parse_document(&html);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2025, 11, 24).unwrap());
        assert_eq!(event.time(), NaiveTime::from_hms_opt(21, 30, 0));
        assert!(!event.is_all_day());
        assert_eq!(event.room, "PokerStars");
        assert_eq!(event.name, "Daily Freeroll");
        assert_eq!(event.prize, "$100");
        assert_eq!(event.password, "abc123");
        assert_eq!(event.source, Source::FreerollPassword);
    }

    #[test]
    fn missing_offset_is_treated_as_utc() {
        let html = page(&[item("888", "November 24, 2025", Some("23:30"), "Late", "x")]);
        let events = FreerollPassword.parse_document(&html);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 11, 25).unwrap());
        assert_eq!(events[0].time(), NaiveTime::from_hms_opt(0, 30, 0));
    }

    #[test]
    fn unparsable_time_becomes_all_day_with_suffix() {
        let html = page(&[item("GGPoker", "November 24, 2025", Some("tba"), "Mystery", "x")]);
        let events = FreerollPassword.parse_document(&html);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_all_day());
        assert_eq!(events[0].name, "Mystery (tba)");
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 11, 24).unwrap());
    }

    #[test]
    fn missing_time_is_all_day() {
        let html = page(&[item("GGPoker", "November 24, 2025", None, "Weekly", "x")]);
        let events = FreerollPassword.parse_document(&html);
        assert!(events[0].is_all_day());
        assert_eq!(events[0].name, "Weekly");
    }

    #[test]
    fn bad_listing_does_not_drop_the_rest() {
        let html = page(&[
            item("A", "sometime soon", Some("20:00 GMT+1"), "Broken", "x"),
            item("B", "Nov 25, 2025", Some("20:00 GMT+1"), "Fine", "y"),
        ]);
        let events = FreerollPassword.parse_document(&html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Fine");
        assert_eq!(events[0].time(), NaiveTime::from_hms_opt(20, 0, 0));
    }

    #[test]
    fn missing_fields_fall_back_to_placeholders() {
        let html = page(&[r#"
            <div class="pt-cv-content-item">
                <div class="fpexcerpt">
                    <span class="date-display-single">November 24, 2025</span>
                </div>
            </div>"#
            .to_string()]);
        let events = FreerollPassword.parse_document(&html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].room, "Unknown");
        assert_eq!(events[0].name, "Unknown");
        assert_eq!(events[0].prize, "n/a");
        assert_eq!(events[0].password, "n/a");
    }

    #[test]
    fn page_without_wrapper_yields_nothing() {
        assert!(FreerollPassword
            .parse_document("<html><body><p>maintenance</p></body></html>")
            .is_empty());
    }
}
