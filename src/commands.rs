use chrono::NaiveDateTime;

use crate::alerts::{minutes_to_start, windowed, EventCache};
use crate::models::Event;
use crate::presenter::{self, DigestKind};
use crate::scraping::Aggregator;

pub const NOTHING_TODAY: &str = "😕 No freerolls in the next 24 hours.";
pub const NOTHING_NEXT: &str = "😕 No upcoming freeroll with a start time.";
pub const TEST_REPLY: &str = "✅ Bot is up and watching for freerolls.";
pub const HELP_REPLY: &str = "\
📖 **Commands**
`!today` - freerolls in the next 24 hours
`!next` - the next freeroll with a start time
`!test` - check that the bot is alive
`!help` - this message

Automatic alerts are posted 1 hour and 10 minutes before each start.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Today,
    Next,
    Test,
    Help,
}

impl Command {
    /// Whole-message, case-insensitive match.
    pub fn parse(content: &str) -> Option<Self> {
        match content.to_lowercase().as_str() {
            "!today" => Some(Command::Today),
            "!next" => Some(Command::Next),
            "!test" => Some(Command::Test),
            "!help" => Some(Command::Help),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Queries {
    cache: EventCache,
    aggregator: Aggregator,
}

impl Queries {
    pub fn new(cache: EventCache, aggregator: Aggregator) -> Self {
        Self { cache, aggregator }
    }

    /// The poll loop's last aggregate, or a fresh fetch before its first tick.
    pub async fn events(&self) -> Vec<Event> {
        if let Some(events) = self.cache.read().await.as_ref() {
            return events.clone();
        }
        self.aggregator.fetch_all().await
    }

    pub async fn respond(&self, command: Command, now: NaiveDateTime) -> Vec<String> {
        match command {
            Command::Today => today_replies(&self.events().await, now),
            Command::Next => vec![next_reply(&self.events().await, now)],
            Command::Test => vec![TEST_REPLY.to_string()],
            Command::Help => vec![HELP_REPLY.to_string()],
        }
    }
}

pub fn today_replies(events: &[Event], now: NaiveDateTime) -> Vec<String> {
    let upcoming = windowed(events, now);
    if upcoming.is_empty() {
        return vec![NOTHING_TODAY.to_string()];
    }
    let mut replies = Vec::with_capacity(upcoming.len() + 1);
    replies.push(presenter::digest_header(DigestKind::NextDay).to_string());
    replies.extend(upcoming.into_iter().map(presenter::render_event));
    replies
}

pub fn next_reply(events: &[Event], now: NaiveDateTime) -> String {
    events
        .iter()
        .filter(|event| !event.is_all_day() && event.effective_timestamp() > now)
        .min_by_key(|event| event.effective_timestamp())
        .map(|event| {
            presenter::next_event(minutes_to_start(event.effective_timestamp(), now), event)
        })
        .unwrap_or_else(|| NOTHING_NEXT.to_string())
}
