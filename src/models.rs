use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

pub const UNKNOWN_ROOM: &str = "Unknown";
pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_PRIZE: &str = "n/a";
pub const UNKNOWN_PASSWORD: &str = "n/a";
pub const PASSWORD_NOT_REQUIRED: &str = "not required";

/// Site a listing was scraped from.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    #[serde(rename = "freeroll-password.com")]
    FreerollPassword,
    #[serde(rename = "freerollpass.com")]
    FreerollPass,
}

impl Source {
    pub fn id(&self) -> &'static str {
        match self {
            Source::FreerollPassword => "freeroll-password.com",
            Source::FreerollPass => "freerollpass.com",
        }
    }
}

/// Free-text fields of a listing, with placeholders for anything the page left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub room: String,
    pub name: String,
    pub prize: String,
    pub password: String,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            room: UNKNOWN_ROOM.to_string(),
            name: UNKNOWN_NAME.to_string(),
            prize: UNKNOWN_PRIZE.to_string(),
            password: UNKNOWN_PASSWORD.to_string(),
        }
    }
}

/// A freeroll tournament, with `date` and `time` already in the destination timezone.
///
/// `time` and `is_all_day` are only set through [`Event::timed`] and
/// [`Event::all_day`], so `is_all_day` always equals `time.is_none()`.
/// The serialized form is also the dedup record, so field names are part of
/// the on-disk format.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub date: NaiveDate,
    time: Option<NaiveTime>,
    is_all_day: bool,
    pub room: String,
    pub name: String,
    pub prize: String,
    pub password: String,
    pub source: Source,
}

impl Event {
    pub fn timed(source: Source, start: NaiveDateTime, listing: Listing) -> Self {
        Self::build(source, start.date(), Some(start.time()), listing)
    }

    pub fn all_day(source: Source, date: NaiveDate, listing: Listing) -> Self {
        Self::build(source, date, None, listing)
    }

    fn build(source: Source, date: NaiveDate, time: Option<NaiveTime>, listing: Listing) -> Self {
        Self {
            date,
            time,
            is_all_day: time.is_none(),
            room: listing.room,
            name: listing.name,
            prize: listing.prize,
            password: listing.password,
            source,
        }
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn is_all_day(&self) -> bool {
        self.is_all_day
    }

    /// Midnight for all-day events, otherwise the start time. Used for
    /// sorting, windowing and alert arithmetic.
    pub fn effective_timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }
}
