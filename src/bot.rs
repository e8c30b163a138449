use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serenity::all::{ActivityData, ChannelId, Context, EventHandler, Message, Ready};
use tracing::{info, warn};

use crate::alerts::{AlertEngine, EventCache};
use crate::commands::{Command, Queries};
use crate::db::Store;
use crate::notifier::DiscordNotifier;
use crate::scraping::{base, Aggregator};

const STATUS_INTERVAL: Duration = Duration::from_secs(20);

pub const STATUS_MESSAGES: [&str; 5] = [
    "👹 Watching the freerolls…",
    "🃏 The hunt is on…",
    "💰 Freeroll radar active",
    "🧨 10-minute alerts armed",
    "♠️ Next freeroll incoming…",
];

/// Gateway handler: starts the background tasks on first `ready` and answers commands.
pub struct Handler {
    channel_id: ChannelId,
    alert_role: String,
    sent_events_path: PathBuf,
    poll_interval: Duration,
    aggregator: Aggregator,
    cache: EventCache,
    queries: Queries,
    started: AtomicBool,
}

impl Handler {
    pub fn new(
        channel_id: u64,
        alert_role: String,
        sent_events_path: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        let aggregator = Aggregator::default();
        let cache = EventCache::default();
        Self {
            channel_id: ChannelId::new(channel_id),
            alert_role,
            sent_events_path,
            poll_interval,
            queries: Queries::new(cache.clone(), aggregator.clone()),
            aggregator,
            cache,
            started: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to discord");

        // Reconnects deliver `ready` again.
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let notifier =
            DiscordNotifier::connect(ctx.http.clone(), self.channel_id, &self.alert_role).await;
        let engine = AlertEngine::new(
            self.aggregator.clone(),
            Store::open(self.sent_events_path.clone()),
            Arc::new(notifier),
            self.cache.clone(),
            self.poll_interval,
        );
        tokio::spawn(engine.run());
        tokio::spawn(rotate_status(ctx));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(command) = Command::parse(&msg.content) else {
            return;
        };

        info!(?command, author = %msg.author.name, "command received");
        let replies = self.queries.respond(command, base::destination_now()).await;
        for reply in replies {
            if let Err(err) = msg.channel_id.say(&ctx.http, reply).await {
                warn!(?command, "failed to reply: {err}");
            }
        }
    }
}

async fn rotate_status(ctx: Context) {
    let mut interval = tokio::time::interval(STATUS_INTERVAL);
    for status in STATUS_MESSAGES.iter().cycle() {
        interval.tick().await;
        ctx.set_activity(Some(ActivityData::playing(*status)));
    }
}
