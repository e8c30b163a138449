use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Selector};

/// Whole hours east of UTC for the timezone every event is displayed in.
pub const DESTINATION_OFFSET_HOURS: i32 = 1;
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const MIN_OFFSET_HOURS: i32 = -12;
const MAX_OFFSET_HOURS: i32 = 14;

static DESTINATION: Lazy<FixedOffset> = Lazy::new(|| {
    offset_from_hours(DESTINATION_OFFSET_HOURS).expect("valid destination offset")
});
static GMT_OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"GMT([+-]\d+)").expect("valid gmt offset regex"));

pub fn destination() -> FixedOffset {
    *DESTINATION
}

/// Current wall-clock time in the destination timezone.
pub fn destination_now() -> NaiveDateTime {
    Utc::now().with_timezone(&destination()).naive_local()
}

pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

pub fn clean_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|node| non_empty(inner_text(node)))
}

/// Text of the node right after the first match of `selector`, for
/// `<span class="label">Label:</span> value` markup.
pub fn sibling_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let label = element.select(selector).next()?;
    let sibling = label.next_sibling()?;
    let text = sibling.value().as_text()?;
    non_empty(clean_text(text))
}

pub fn fetch_html(url: &str) -> Result<String> {
    static CLIENT: Lazy<Client> = Lazy::new(|| {
        Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36")
            .build()
            .expect("http client")
    });

    let response = CLIENT
        .get(url)
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("non-success status for {url}"))?;
    response
        .text()
        .with_context(|| format!("unable to read response body for {url}"))
}

/// Tries each format in order and returns the first successful parse.
pub fn parse_date(input: &str, formats: &[&str]) -> Option<NaiveDate> {
    let cleaned = clean_text(input);
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let cleaned = clean_text(input);
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())
}

/// Signed whole-hour offset from a `GMT+2` style token; 0 when absent or out of range.
pub fn parse_gmt_offset(text: &str) -> i32 {
    GMT_OFFSET_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|hours| offset_from_hours(*hours).is_some())
        .unwrap_or(0)
}

/// Reinterprets a wall-clock time recorded at `offset_hours` as destination wall-clock time.
pub fn to_destination(local: NaiveDateTime, offset_hours: i32) -> Option<NaiveDateTime> {
    let offset = offset_from_hours(offset_hours)?;
    let aware = local.and_local_timezone(offset).single()?;
    Some(aware.with_timezone(&destination()).naive_local())
}

/// Derives a page's timezone from the clock it shows, relative to destination time.
/// Half-hour differences round to the even hour.
pub fn server_offset_hours(server_now: NaiveDateTime, destination_now: NaiveDateTime) -> i32 {
    let diff_seconds = (server_now - destination_now).num_seconds() as f64;
    let diff_hours = (diff_seconds / 3600.0).round_ties_even() as i32;
    (DESTINATION_OFFSET_HOURS + diff_hours).clamp(MIN_OFFSET_HOURS, MAX_OFFSET_HOURS)
}
