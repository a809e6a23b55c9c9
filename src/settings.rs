//! Widget settings persistence
//!
//! Handles saving and loading widget configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WidgetSettings {
    /// Log swallowed failures and per-track cover diagnostics
    #[serde(default)]
    pub debug: bool,
    /// Cover resolution settings
    #[serde(default)]
    pub cover: CoverSettings,
    /// Lyric scroll synchronization settings
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Cover art resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverSettings {
    /// Host serving direct NetEase artwork
    pub asset_host: String,
    /// Requested size in NetEase `WxH` form
    pub target_size: String,
    /// Meting proxies whose `type=pic` URLs carry a picture id
    pub proxy_hosts: Vec<String>,
    /// Meting URL template with `:server`, `:type`, `:id`, `:auth`, `:r`
    pub meting_api: Option<String>,
    /// Meting `server` value
    pub server: String,
}

/// Lyric scroll settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Where the active line sits in the viewport (0.5 = centered)
    pub anchor_ratio: f32,
    pub wheel_grace_ms: u64,
    pub touch_grace_ms: u64,
    pub pointer_grace_ms: u64,
    pub scroll_grace_ms: u64,
    /// Grace after clicking a line's time label
    pub seek_grace_ms: u64,
}

impl Default for CoverSettings {
    fn default() -> Self {
        Self {
            asset_host: "p3.music.126.net".to_string(),
            target_size: "2000y2000".to_string(),
            proxy_hosts: vec![
                "meting.qjqq.cn".to_string(),
                "api.injahow.cn".to_string(),
            ],
            meting_api: None,
            server: "netease".to_string(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            anchor_ratio: 0.5,
            wheel_grace_ms: 1500,
            touch_grace_ms: 1800,
            pointer_grace_ms: 1500,
            scroll_grace_ms: 1200,
            seek_grace_ms: 1200,
        }
    }
}

impl WidgetSettings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "music-widget", "MusicWidget")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
