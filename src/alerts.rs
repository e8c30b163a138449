use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{NaiveDateTime, TimeDelta};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::db::{already_sent, Store};
use crate::models::Event;
use crate::notifier::Notifier;
use crate::presenter::{self, DigestKind};
use crate::scraping::{base, Aggregator};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Last aggregate fetched by the poll loop; `None` until the first tick.
pub type EventCache = Arc<RwLock<Option<Vec<Event>>>>;

fn window() -> TimeDelta {
    TimeDelta::hours(24)
}

fn key_retention() -> TimeDelta {
    TimeDelta::hours(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    OneHour,
    TenMinutes,
}

impl AlertKind {
    /// One-hour band is `(10, 60)`, ten-minute band is `[0, 10)`.
    pub fn for_minutes(minutes_to_start: i64) -> Option<Self> {
        match minutes_to_start {
            11..=59 => Some(AlertKind::OneHour),
            0..=9 => Some(AlertKind::TenMinutes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub starts_at: NaiveDateTime,
    pub name: String,
    pub kind: AlertKind,
}

#[derive(Debug, Default)]
pub struct AlertTracker {
    sent: HashSet<AlertKey>,
}

impl AlertTracker {
    pub fn contains(&self, key: &AlertKey) -> bool {
        self.sent.contains(key)
    }

    pub fn insert(&mut self, key: AlertKey) -> bool {
        self.sent.insert(key)
    }

    pub fn purge(&mut self, now: NaiveDateTime) {
        let cutoff = now - key_retention();
        self.sent.retain(|key| key.starts_at >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

/// Whole minutes until `starts_at`, rounded down.
pub fn minutes_to_start(starts_at: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (starts_at - now).num_seconds().div_euclid(60)
}

pub fn windowed(events: &[Event], now: NaiveDateTime) -> Vec<&Event> {
    let end = now + window();
    events
        .iter()
        .filter(|event| {
            let at = event.effective_timestamp();
            now <= at && at <= end
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub fetched: usize,
    pub windowed: usize,
    pub announced: usize,
    pub alerts: usize,
}

pub struct AlertEngine {
    aggregator: Aggregator,
    store: Store,
    notifier: Arc<dyn Notifier>,
    cache: EventCache,
    alerts: AlertTracker,
    poll_interval: Duration,
}

impl AlertEngine {
    pub fn new(
        aggregator: Aggregator,
        store: Store,
        notifier: Arc<dyn Notifier>,
        cache: EventCache,
        poll_interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            store,
            notifier,
            cache,
            alerts: AlertTracker::default(),
            poll_interval,
        }
    }

    pub async fn run(mut self) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            store = ?self.store.path(),
            "alert engine started"
        );
        loop {
            let events = self.aggregator.fetch_all().await;
            self.process(events, base::destination_now()).await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn process(&mut self, events: Vec<Event>, now: NaiveDateTime) -> TickSummary {
        *self.cache.write().await = Some(events.clone());

        if let Err(err) = self.store.prune_stale(now.date()) {
            warn!("failed to prune sent events: {err}");
        }

        let window = windowed(&events, now);
        let announced = self.send_digest(&window, now).await;
        let alerts = self.send_alerts(&window, now).await;
        self.alerts.purge(now);

        let summary = TickSummary {
            fetched: events.len(),
            windowed: window.len(),
            announced,
            alerts,
        };
        info!(
            fetched = summary.fetched,
            windowed = summary.windowed,
            announced = summary.announced,
            alerts = summary.alerts,
            tracked_alerts = self.alerts.len(),
            "poll tick complete"
        );
        summary
    }

    async fn send_digest(&self, window: &[&Event], now: NaiveDateTime) -> usize {
        let records = self.store.load_all();
        let mut fresh: Vec<&Event> = Vec::new();
        for event in window.iter().copied() {
            if !already_sent(event, &records) && !fresh.contains(&event) {
                fresh.push(event);
            }
        }
        if fresh.is_empty() {
            return 0;
        }

        let today = now.date();
        let kind = if records.iter().any(|record| record.date() == Some(today)) {
            DigestKind::DailyUpdate
        } else {
            DigestKind::NextDay
        };
        if let Err(err) = self.notifier.send(presenter::digest_header(kind)).await {
            warn!("failed to send digest header: {err}");
        }

        let mut announced = 0;
        for event in fresh {
            if let Err(err) = self.notifier.send(&presenter::render_event(event)).await {
                warn!(event = %event.name, "failed to announce, will retry next tick: {err}");
                continue;
            }
            match self.store.append(event) {
                Ok(_) => announced += 1,
                Err(err) => warn!(event = %event.name, "failed to record sent event: {err}"),
            }
        }
        announced
    }

    async fn send_alerts(&mut self, window: &[&Event], now: NaiveDateTime) -> usize {
        let mention = self.notifier.alert_mention().map(str::to_string);
        let mut fired = 0;

        for event in window.iter().filter(|event| !event.is_all_day()) {
            let starts_at = event.effective_timestamp();
            let minutes = minutes_to_start(starts_at, now);
            let Some(kind) = AlertKind::for_minutes(minutes) else {
                continue;
            };
            let key = AlertKey {
                starts_at,
                name: event.name.clone(),
                kind,
            };
            if self.alerts.contains(&key) {
                continue;
            }

            let text = match kind {
                AlertKind::OneHour => presenter::one_hour_alert(mention.as_deref(), minutes, event),
                AlertKind::TenMinutes => {
                    presenter::ten_minute_alert(mention.as_deref(), minutes, event)
                }
            };
            match self.notifier.send(&text).await {
                Ok(()) => {
                    debug!(event = %event.name, ?kind, minutes, "alert sent");
                    self.alerts.insert(key);
                    fired += 1;
                }
                Err(err) => warn!(event = %event.name, ?kind, "failed to send alert: {err}"),
            }
        }
        fired
    }
}
