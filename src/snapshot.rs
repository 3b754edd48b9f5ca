//! Mode snapshots for restarts.
//!
//! The automation survives host restarts by persisting its mode and the
//! pending transition deadline. A snapshot older than an hour is stale
//! (the light situation has moved on), so the controller starts fresh in
//! Neutral instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::common::constants::SNAPSHOT_MAX_AGE_MINUTES;
use crate::state_machine::Mode;

/// On-disk snapshot of one controller.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    /// Mode scale position.
    pub state: i8,
    pub timer: Option<DateTime<Local>>,
}

fn snapshot_path(directory: &Path, unique_id: &str) -> PathBuf {
    directory.join(format!("states_{unique_id}.json"))
}

/// Persist the snapshot atomically (write to a temp file, then rename).
pub fn save(
    directory: &Path,
    unique_id: &str,
    mode: Mode,
    timer: Option<DateTime<Local>>,
    now: DateTime<Local>,
) -> Result<()> {
    let snapshot = Snapshot {
        timestamp: now,
        state: mode.scale(),
        timer,
    };
    let path = snapshot_path(directory, unique_id);

    let file = NamedTempFile::new_in(directory)
        .with_context(|| format!("creating snapshot temp file in {}", directory.display()))?;
    serde_json::to_writer_pretty(file.as_file(), &snapshot).context("serializing snapshot")?;
    file.persist(&path)
        .with_context(|| format!("persisting snapshot {}", path.display()))?;
    Ok(())
}

/// Load a snapshot if present and fresh.
///
/// Any failure is non-fatal: a missing, unparseable or stale file yields
/// `None` and the machine starts in Neutral.
pub fn load(
    directory: &Path,
    unique_id: &str,
    now: DateTime<Local>,
) -> Option<(Mode, Option<DateTime<Local>>)> {
    let path = snapshot_path(directory, unique_id);
    let raw = std::fs::read_to_string(&path).ok()?;
    let snapshot: Snapshot = match serde_json::from_str(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log_warning!("Ignoring unreadable snapshot {}: {err}", path.display());
            return None;
        }
    };

    let age = now - snapshot.timestamp;
    if age > chrono::Duration::minutes(SNAPSHOT_MAX_AGE_MINUTES) {
        log_debug!("Snapshot too old ({}), not loading", snapshot.timestamp);
        return None;
    }

    let Some(mode) = Mode::from_scale(snapshot.state) else {
        log_warning!("Snapshot holds unknown state {}, starting in Neutral", snapshot.state);
        return None;
    };
    Some((mode, snapshot.timer))
}
