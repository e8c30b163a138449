use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{ChannelId, Http, RoleId};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    /// Mention prefixed to pre-start alerts, if an alert role is configured and exists.
    fn alert_mention(&self) -> Option<&str> {
        None
    }
}

pub struct DiscordNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
    mention: Option<String>,
}

impl DiscordNotifier {
    /// Resolves `role_name` in the channel's guild once; alerts go out
    /// without a mention if it cannot be found.
    pub async fn connect(http: Arc<Http>, channel_id: ChannelId, role_name: &str) -> Self {
        let mention = match find_role(&http, channel_id, role_name).await {
            Ok(Some(role_id)) => {
                info!(role = role_name, "alert role resolved");
                Some(format!("<@&{role_id}>"))
            }
            Ok(None) => {
                warn!(role = role_name, "alert role not found, alerts will not mention anyone");
                None
            }
            Err(err) => {
                warn!(role = role_name, "alert role lookup failed: {err}");
                None
            }
        };
        Self {
            http,
            channel_id,
            mention,
        }
    }
}

async fn find_role(
    http: &Arc<Http>,
    channel_id: ChannelId,
    role_name: &str,
) -> Result<Option<RoleId>, serenity::Error> {
    let Some(channel) = http.get_channel(channel_id).await?.guild() else {
        return Ok(None);
    };
    let roles = channel.guild_id.roles(http).await?;
    Ok(roles
        .into_values()
        .find(|role| role.name == role_name)
        .map(|role| role.id))
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.channel_id.say(&self.http, text).await?;
        Ok(())
    }

    fn alert_mention(&self) -> Option<&str> {
        self.mention.as_deref()
    }
}

/// Logs every message instead of posting it.
pub struct DryRunNotifier {
    mention: String,
}

impl DryRunNotifier {
    pub fn new(role_name: &str) -> Self {
        Self {
            mention: format!("@{role_name}"),
        }
    }
}

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "dry_run", "would send:\n{text}");
        Ok(())
    }

    fn alert_mention(&self) -> Option<&str> {
        Some(&self.mention)
    }
}
