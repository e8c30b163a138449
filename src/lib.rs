pub mod alerts;
pub mod bot;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod notifier;
pub mod presenter;
pub mod scraping;
pub mod utils;

use std::sync::Arc;

use anyhow::Context as _;
use serenity::all::{Client, GatewayIntents};
use tracing::{info, warn};

use alerts::{AlertEngine, EventCache};
use bot::Handler;
use config::{Config, DiscordConfig};
use db::Store;
use notifier::DryRunNotifier;
use scraping::Aggregator;

/// Loads configuration and runs until the bot disconnects or Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    info!(
        dry_run = config.dry_run,
        store = ?config.sent_events_path,
        "starting freeroll bot"
    );

    match config.discord.clone() {
        Some(discord) if !config.dry_run => run_discord(discord, config).await,
        _ => run_dry(config).await,
    }
}

async fn run_dry(config: Config) -> anyhow::Result<()> {
    info!("dry-run mode, messages are logged instead of posted");
    let engine = AlertEngine::new(
        Aggregator::default(),
        Store::open(config.sent_events_path),
        Arc::new(DryRunNotifier::new(&config.alert_role)),
        EventCache::default(),
        config.poll_interval,
    );

    tokio::select! {
        _ = engine.run() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            info!("shutting down");
        }
    }
    Ok(())
}

async fn run_discord(discord: DiscordConfig, config: Config) -> anyhow::Result<()> {
    let handler = Handler::new(
        discord.channel_id,
        config.alert_role,
        config.sent_events_path,
        config.poll_interval,
    );
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&discord.token, intents)
        .event_handler(handler)
        .await
        .context("failed to build discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutting down");
                shard_manager.shutdown_all().await;
            }
            Err(err) => warn!("failed to listen for ctrl-c: {err}"),
        }
    });

    client.start().await.context("discord client stopped")?;
    Ok(())
}
