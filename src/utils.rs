use dirs::data_dir;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub fn data_root() -> PathBuf {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("freeroll-bot")
}

pub fn sent_events_path() -> PathBuf {
    data_root().join("sent_events.json")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("failed to create parent {:?}: {err}", parent);
        }
    }
}
