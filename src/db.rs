use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Event;
use crate::utils;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize sent events: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

// Raw JSON so a hand-edited or older file still loads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    pub fn from_event(event: &Event) -> Result<Self, StoreError> {
        Ok(Self(serde_json::to_value(event)?))
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.0
            .get("date")
            .and_then(Value::as_str)
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
    }
}

/// Flat JSON file of every event already announced. Only the poll loop
/// writes, so read-modify-write needs no locking.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or corrupt storage reads as empty.
    pub fn load_all(&self) -> Vec<Record> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!("failed to read {:?}: {err}", self.path);
                return Vec::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(err) => {
                warn!("ignoring corrupt sent-events file {:?}: {err}", self.path);
                Vec::new()
            }
        }
    }

    /// Adds `event` unless an identical record exists. Returns whether it was added.
    pub fn append(&self, event: &Event) -> Result<bool, StoreError> {
        let mut records = self.load_all();
        if already_sent(event, &records) {
            return Ok(false);
        }
        records.push(Record::from_event(event)?);
        self.write_all(&records)?;
        Ok(true)
    }

    /// Drops every record dated before `today`, including records whose date
    /// cannot be read. Returns how many were removed.
    pub fn prune_stale(&self, today: NaiveDate) -> Result<usize, StoreError> {
        let records = self.load_all();
        let before = records.len();
        let kept: Vec<Record> = records
            .into_iter()
            .filter(|record| record.date().is_some_and(|date| date >= today))
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write_all(&kept)?;
            debug!(removed, remaining = kept.len(), "pruned stale sent events");
        }
        Ok(removed)
    }

    fn write_all(&self, records: &[Record]) -> Result<(), StoreError> {
        utils::ensure_parent(&self.path);
        let contents = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, contents).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn already_sent(event: &Event, records: &[Record]) -> bool {
    match Record::from_event(event) {
        Ok(candidate) => records.contains(&candidate),
        Err(err) => {
            warn!("failed to serialize event {:?}: {err}", event.name);
            false
        }
    }
}
