//! Loads and persists the main settings file: the three behavior flags plus
//! the transient buffer cached across restarts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::values::CharValue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSettings {
    #[serde(default)]
    minimized: bool,
    #[serde(default)]
    snap_to_bottom: bool,
    #[serde(default)]
    immediate_mode: bool,
    #[serde(default)]
    cached_buffer: Vec<CharValue>,
}

/// The three persistent behavior flags plus whatever buffer contents were
/// cached on the last restart request.
#[derive(Debug, Clone, Default)]
pub struct MainSettings {
    pub minimized: bool,
    pub snap_to_bottom: bool,
    pub immediate_mode: bool,
    cached_buffer: Vec<CharValue>,
    path: PathBuf,
}

impl MainSettings {
    /// Loads settings from `path`. A missing file yields defaults rather
    /// than an error, since first-run daemons won't have one yet.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(content) => {
                serde_json::from_str(&content).with_context(|| format!("failed to parse settings at {path:?}"))?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RawSettings::default(),
            Err(err) => return Err(err).with_context(|| format!("failed to read settings at {path:?}")),
        };
        Ok(MainSettings {
            minimized: raw.minimized,
            snap_to_bottom: raw.snap_to_bottom,
            immediate_mode: raw.immediate_mode,
            cached_buffer: raw.cached_buffer,
            path: path.to_path_buf(),
        })
    }

    /// Removes and returns the cached buffer, consuming it exactly once;
    /// the caller is responsible for persisting the now-empty state via
    /// [`Self::save`] so a later restart doesn't see stale contents.
    pub fn take_cached_buffer(&mut self) -> Vec<CharValue> {
        std::mem::take(&mut self.cached_buffer)
    }

    /// Writes the current flags (and whatever `cached_buffer` holds, which
    /// is normally empty except immediately before a restart request) back
    /// to disk.
    pub fn save(&self) -> Result<()> {
        let raw = RawSettings {
            minimized: self.minimized,
            snap_to_bottom: self.snap_to_bottom,
            immediate_mode: self.immediate_mode,
            cached_buffer: self.cached_buffer.clone(),
        };
        let content = serde_json::to_string_pretty(&raw).context("failed to serialize settings")?;
        fs::write(&self.path, content).with_context(|| format!("failed to write settings at {:?}", self.path))
    }

    /// Stages `buffer` to be written out on the next [`Self::save`], for a
    /// restart request that wants to preserve in-progress output.
    pub fn set_cached_buffer(&mut self, buffer: Vec<CharValue>) {
        self.cached_buffer = buffer;
    }
}
