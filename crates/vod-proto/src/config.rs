use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::platform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Audio language passed to the built-in mpv command.
    #[serde(default = "default_language")]
    pub preferred_language: String,
    #[serde(default = "default_check_updates")]
    pub check_updates: bool,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// GitHub-style "latest release" endpoint; an empty string turns the
    /// check off along with `check_updates = false`.
    #[serde(default = "default_update_feed", skip_serializing_if = "Option::is_none")]
    pub update_feed: Option<String>,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    #[serde(default)]
    pub custom_playback_options: Vec<CommandChain>,
}

/// A user-defined playback action: one or more commands run against an item.
///
/// Tokens may contain `$url` (resolved stream URL) and `$file` (local copy of
/// the playlist, downloaded on first use).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandChain {
    pub title: String,
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default)]
    pub commands: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchphrase: Option<String>,
    /// Index of the command whose stdout is scanned for `watchphrase`; -1 disables.
    #[serde(default = "default_command_to_watch")]
    pub command_to_watch: i64,
}

impl CommandChain {
    /// The command index to monitor, if monitoring is configured and in range.
    pub fn watched_index(&self) -> Option<usize> {
        let phrase = self.watchphrase.as_deref()?;
        if phrase.is_empty() {
            return None;
        }
        let idx = usize::try_from(self.command_to_watch).ok()?;
        (idx < self.commands.len()).then_some(idx)
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_check_updates() -> bool {
    true
}

fn default_update_feed() -> Option<String> {
    Some("https://api.github.com/repos/SoMuchForSubtlety/F1viewer/releases/latest".to_string())
}

fn default_api_base() -> String {
    "https://f1tv.formula1.com".to_string()
}

fn default_command_to_watch() -> i64 {
    -1
}

fn default_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vodnav")
}

impl Config {
    /// Read `path`, writing the defaults there first if it does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like `load_from`, but a missing/malformed file only costs a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("config {}: {:#}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_language: default_language(),
            check_updates: default_check_updates(),
            api_base: default_api_base(),
            update_feed: default_update_feed(),
            downloads_dir: default_downloads_dir(),
            custom_playback_options: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(commands: usize, watch: i64, phrase: Option<&str>) -> CommandChain {
        CommandChain {
            title: "t".to_string(),
            concurrent: false,
            commands: vec![vec!["true".to_string()]; commands],
            watchphrase: phrase.map(str::to_string),
            command_to_watch: watch,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.preferred_language, "en");
        assert!(config.check_updates);
        assert!(config.api_base.starts_with("https://"));
        assert!(config.update_feed.as_deref().is_some_and(|u| u.ends_with("/releases/latest")));
        assert!(config.custom_playback_options.is_empty());
    }

    #[test]
    fn watched_index_requires_phrase_and_range() {
        assert_eq!(chain(2, 1, Some("Video")).watched_index(), Some(1));
        assert_eq!(chain(2, 2, Some("Video")).watched_index(), None);
        assert_eq!(chain(2, -1, Some("Video")).watched_index(), None);
        assert_eq!(chain(2, 0, Some("")).watched_index(), None);
        assert_eq!(chain(2, 0, None).watched_index(), None);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            preferred_language = "de"

            [[custom_playback_options]]
            title = "VLC"
            commands = [["vlc", "$url"]]
            "#,
        )
        .unwrap();
        assert_eq!(config.preferred_language, "de");
        assert!(config.check_updates);
        assert_eq!(config.update_feed, Config::default().update_feed);
        let vlc = &config.custom_playback_options[0];
        assert!(!vlc.concurrent);
        assert_eq!(vlc.command_to_watch, -1);
        assert_eq!(vlc.commands, vec![vec!["vlc".to_string(), "$url".to_string()]]);
    }
}
