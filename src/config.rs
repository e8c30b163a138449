use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::info;

use crate::alerts::DEFAULT_POLL_INTERVAL;
use crate::utils;

pub const DEFAULT_ALERT_ROLE: &str = "notif_poker";
const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingValue(&'static str),

    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),

    #[error("failed to read config file {path:?}: {reason}")]
    File { path: PathBuf, reason: String },
}

/// `channel_id` shows up both as a JSON number and as a quoted snowflake.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn into_text(self) -> String {
        match self {
            RawId::Number(id) => id.to_string(),
            RawId::Text(text) => text,
        }
    }
}

/// On-disk settings; every key is optional and environment variables win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub discord_token: Option<String>,
    pub channel_id: Option<RawId>,
    pub alert_role: Option<String>,
    pub sent_events_path: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordConfig {
    pub token: String,
    pub channel_id: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` only in dry-run mode without credentials.
    pub discord: Option<DiscordConfig>,
    pub alert_role: String,
    pub sent_events_path: PathBuf,
    pub poll_interval: Duration,
    pub dry_run: bool,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = env::var("FREEROLL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let file = read_file(&path)?;
        Self::from_sources(file, |key| env::var(key).ok())
    }

    pub fn from_sources<F>(file: FileConfig, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dry_run = match var("DRY_RUN") {
            Some(raw) => parse_flag(&raw),
            None => file.dry_run.unwrap_or(false),
        };

        let token = non_empty(var("DISCORD_TOKEN")).or(non_empty(file.discord_token));
        let channel = non_empty(var("CHANNEL_ID"))
            .or(non_empty(file.channel_id.map(RawId::into_text)));

        let discord = match (token, channel) {
            (Some(token), Some(channel)) => Some(DiscordConfig {
                token,
                channel_id: parse_channel_id(&channel)?,
            }),
            _ if dry_run => None,
            (None, _) => return Err(ConfigError::MissingValue("DISCORD_TOKEN")),
            (_, None) => return Err(ConfigError::MissingValue("CHANNEL_ID")),
        };

        let poll_interval = match var("POLL_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_interval(&raw)?),
            None => file
                .poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        };

        Ok(Config {
            discord,
            alert_role: non_empty(var("ALERT_ROLE"))
                .or(non_empty(file.alert_role))
                .unwrap_or_else(|| DEFAULT_ALERT_ROLE.to_string()),
            sent_events_path: var("SENT_EVENTS_PATH")
                .map(PathBuf::from)
                .or(file.sent_events_path)
                .unwrap_or_else(utils::sent_events_path),
            poll_interval,
            dry_run,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(err) => {
            return Err(ConfigError::File {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
        }
    };
    info!("loading settings from {:?}", path);
    serde_json::from_str(&contents).map_err(|err| ConfigError::File {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_channel_id(raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ConfigError::InvalidValue("CHANNEL_ID", raw.to_string())),
    }
}

fn parse_interval(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue("POLL_INTERVAL_SECS", raw.to_string())),
    }
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_supplies_credentials_and_defaults() {
        let config = Config::from_sources(
            FileConfig::default(),
            env_of(&[("DISCORD_TOKEN", "tok"), ("CHANNEL_ID", "123456789")]),
        )
        .unwrap();
        assert_eq!(
            config.discord,
            Some(DiscordConfig {
                token: "tok".to_string(),
                channel_id: 123456789,
            })
        );
        assert_eq!(config.alert_role, DEFAULT_ALERT_ROLE);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(!config.dry_run);
    }

    #[test]
    fn missing_token_is_fatal_outside_dry_run() {
        let err = Config::from_sources(FileConfig::default(), env_of(&[("CHANNEL_ID", "1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue("DISCORD_TOKEN")));

        let err = Config::from_sources(FileConfig::default(), env_of(&[("DISCORD_TOKEN", "tok")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue("CHANNEL_ID")));
    }

    #[test]
    fn non_numeric_channel_is_rejected() {
        let err = Config::from_sources(
            FileConfig::default(),
            env_of(&[("DISCORD_TOKEN", "tok"), ("CHANNEL_ID", "general")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("CHANNEL_ID", _)));
    }

    #[test]
    fn dry_run_needs_no_credentials() {
        let config =
            Config::from_sources(FileConfig::default(), env_of(&[("DRY_RUN", "yes")])).unwrap();
        assert!(config.dry_run);
        assert!(config.discord.is_none());
    }

    #[test]
    fn file_values_apply_and_env_overrides_them() {
        let file: FileConfig = serde_json::from_str(
            r#"{"discord_token": "file-tok", "channel_id": 42, "alert_role": "grinders", "poll_interval_secs": 60}"#,
        )
        .unwrap();

        let config = Config::from_sources(file.clone(), env_of(&[])).unwrap();
        let discord = config.discord.unwrap();
        assert_eq!(discord.token, "file-tok");
        assert_eq!(discord.channel_id, 42);
        assert_eq!(config.alert_role, "grinders");
        assert_eq!(config.poll_interval, Duration::from_secs(60));

        let config = Config::from_sources(
            file,
            env_of(&[("DISCORD_TOKEN", "env-tok"), ("POLL_INTERVAL_SECS", "30")]),
        )
        .unwrap();
        assert_eq!(config.discord.unwrap().token, "env-tok");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn channel_id_may_be_quoted_in_file() {
        let file: FileConfig =
            serde_json::from_str(r#"{"discord_token": "t", "channel_id": "987"}"#).unwrap();
        let config = Config::from_sources(file, env_of(&[])).unwrap();
        assert_eq!(config.discord.unwrap().channel_id, 987);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }
}
