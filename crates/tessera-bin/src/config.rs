//! Configuration loading.
//!
//! `tessera.toml` is discovered in the directories of `TESSERA_PATH`
//! (colon-separated, highest priority first) and then in the user config
//! directory. Unknown keys are ignored so configs survive version skew.
//! `ESCDELAY` follows the curses convention and overrides the config value.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const CONFIG_FILE: &str = "tessera.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Columns per tab stop.
    pub tabwidth: usize,
    /// "wrap" or "truncate".
    pub wrap: String,
    /// Milliseconds to wait when telling ESC apart from an escape-prefixed
    /// key sequence.
    pub escdelay: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tabwidth: 8,
            wrap: "wrap".to_string(),
            escdelay: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UiConfig {
    /// Theme name; resolved by the theme loader, opaque here.
    pub theme: Option<String>,
}

impl Config {
    pub fn wrap_mode(&self) -> core_view::WrapMode {
        if self.editor.wrap == "truncate" {
            core_view::WrapMode::Truncate
        } else {
            core_view::WrapMode::Wrap
        }
    }

    pub fn escdelay(&self) -> Duration {
        let ms = std::env::var("ESCDELAY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.editor.escdelay);
        Duration::from_millis(ms)
    }
}

/// Candidate directories, highest priority first.
fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(path) = std::env::var("TESSERA_PATH") {
        dirs.extend(std::env::split_paths(&path));
    }
    if let Some(config) = dirs::config_dir() {
        dirs.push(config.join("tessera"));
    }
    dirs
}

pub fn load_from(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)?;
    let config = toml::from_str(&raw)?;
    info!(target: "config", path = %path.display(), "loaded");
    Ok(config)
}

/// Discover and load the config; missing or malformed files fall back to
/// defaults (a malformed file is reported through the returned message).
pub fn load() -> (Config, Option<String>) {
    for dir in search_dirs() {
        let candidate = dir.join(CONFIG_FILE);
        if !candidate.is_file() {
            continue;
        }
        match load_from(&candidate) {
            Ok(config) => return (config, None),
            Err(err) => {
                return (
                    Config::default(),
                    Some(format!("{}: {err}", candidate.display())),
                );
            }
        }
    }
    (Config::default(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.editor.tabwidth, 8);
        assert_eq!(config.wrap_mode(), core_view::WrapMode::Wrap);
    }

    #[test]
    fn parses_partial_config() {
        let config: Config = toml::from_str("[editor]\ntabwidth = 4\n").unwrap();
        assert_eq!(config.editor.tabwidth, 4);
        assert_eq!(config.editor.wrap, "wrap");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config: Config =
            toml::from_str("[editor]\nwrap = \"truncate\"\nfuture_knob = true\n").unwrap();
        assert_eq!(config.wrap_mode(), core_view::WrapMode::Truncate);
    }

    #[test]
    fn load_from_reports_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "not toml [").unwrap();
        assert!(load_from(&path).is_err());
    }
}
