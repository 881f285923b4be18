//! Loads the key-binding file and keeps it live-reloaded, mirroring the
//! teacher's `UserConfig` watcher but mapping action names to structured
//! bindings instead of shell commands.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;

/// One bound action: the platform key descriptor used to recognize it, a
/// human-readable name, and the single character shown for it in a help
/// overlay.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Binding {
    pub key: String,
    pub display_name: String,
    pub display_char: char,
}

/// Action names the five physical chord keys are bound to. Required to be
/// present in every key-binding file.
pub const CHORD_KEY_ACTIONS: [&str; 5] =
    ["chord_key_0", "chord_key_1", "chord_key_2", "chord_key_3", "chord_key_4"];

pub type Bindings = Arc<RwLock<HashMap<String, Binding>>>;

fn parse_bindings(content: &str) -> Result<HashMap<String, Binding>> {
    let bindings: HashMap<String, Binding> =
        serde_json::from_str(content).context("failed to parse key-binding file")?;
    for action in CHORD_KEY_ACTIONS {
        if !bindings.contains_key(action) {
            log::warn!("key-binding file is missing required action {action:?}");
        }
    }
    Ok(bindings)
}

fn read_bindings(path: &Path) -> Result<HashMap<String, Binding>> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read key-binding file at {path:?}"))?;
    parse_bindings(&content)
}

/// Loads the key-binding file and shares it behind a reader-writer lock.
pub fn load(path: &Path) -> Result<Bindings> {
    let bindings = read_bindings(path)?;
    Ok(Arc::new(RwLock::new(bindings)))
}

/// Starts a background watcher that reloads `bindings` in place whenever
/// `path` changes on disk. Reload failures are logged and the previous
/// in-memory bindings are kept.
pub fn start_watcher(path: PathBuf, bindings: Bindings) -> Result<RecommendedWatcher> {
    let (tx, rx) = mpsc::channel();
    let mut watcher =
        RecommendedWatcher::new(tx, notify::Config::default()).context("failed to create key-binding watcher")?;
    let watch_dir = path.parent().context("key-binding path has no parent directory")?.to_path_buf();
    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch key-binding directory at {watch_dir:?}"))?;

    std::thread::spawn(move || watcher_loop(rx, path, bindings));
    Ok(watcher)
}

fn watcher_loop(receiver: mpsc::Receiver<Result<notify::Event, notify::Error>>, path: PathBuf, bindings: Bindings) {
    let mut last_reload = Instant::now() - Duration::from_secs(1);
    for event_result in receiver {
        match event_result {
            Ok(event) if event.kind.is_modify() => {
                let now = Instant::now();
                if now.duration_since(last_reload) < Duration::from_millis(50) {
                    continue;
                }
                std::thread::sleep(Duration::from_millis(20));
                match read_bindings(&path) {
                    Ok(updated) => {
                        *bindings.write().expect("key-binding lock poisoned") = updated;
                        log::info!("reloaded key bindings from {path:?}");
                    }
                    Err(err) => log::error!("failed to reload key bindings: {err}"),
                }
                last_reload = now;
            }
            Ok(_) => {}
            Err(err) => log::error!("key-binding watch error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "chord_key_0": {"key": "a", "display_name": "Chord 0", "display_char": "0"},
            "toggle_shift": {"key": "Tab", "display_name": "Shift", "display_char": "s"}
        }"#
    }

    #[test]
    fn parses_bindings_by_action_name() {
        let bindings = parse_bindings(sample_json()).unwrap();
        assert_eq!(bindings["chord_key_0"].key, "a");
        assert_eq!(bindings["toggle_shift"].display_char, 's');
    }

    #[test]
    fn missing_chord_key_actions_are_warnings_not_errors() {
        let bindings = parse_bindings(r#"{"toggle_shift": {"key": "Tab", "display_name": "Shift", "display_char": "s"}}"#).unwrap();
        assert_eq!(bindings.len(), 1);
    }
}
