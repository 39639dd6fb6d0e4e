// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! User settings, stored as JSON in the platform config directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::annotation::{DEFAULT_COLOR, DEFAULT_STROKE_WIDTH};

const APP_DIR: &str = "pitchmark";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long the "frozen" indicator stays lit after drawing starts.
    pub freeze_duration_secs: f64,
    pub clip_pre_seconds: f64,
    pub clip_post_seconds: f64,
    pub highlights_folder: String,
    pub ffmpeg_program: String,
    pub clip_timeout_secs: u64,
    pub concat_timeout_secs: u64,
    pub default_color: String,
    pub default_stroke_width: f32,
    pub palette: Vec<String>,
    /// Rates offered in the toolbar; `0` is frame-by-frame.
    pub playback_rates: Vec<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            freeze_duration_secs: 3.0,
            clip_pre_seconds: 5.0,
            clip_post_seconds: 5.0,
            highlights_folder: "Highlights".to_string(),
            ffmpeg_program: "ffmpeg".to_string(),
            clip_timeout_secs: 60,
            concat_timeout_secs: 300,
            default_color: DEFAULT_COLOR.to_string(),
            default_stroke_width: DEFAULT_STROKE_WIDTH,
            palette: [
                "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF", "#FFFFFF", "#FFA500",
                "#800080", "#008000", "#FFC0CB", "#A52A2A",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            playback_rates: vec![2.0, 1.0, 0.75, 0.5, 0.25, 0.1, 0.0],
        }
    }
}

impl Settings {
    /// `<config_dir>/pitchmark/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join(SETTINGS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&raw).with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Settings from the default location, or defaults when there are none.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            log::warn!("No config directory, using default settings");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{:#}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Save to the default location, logging failures.
    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            log::warn!("No config directory, settings not saved");
            return;
        };
        if let Err(e) = self.save_to(&path) {
            log::error!("Failed to save settings: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.freeze_duration_secs, 3.0);
        assert_eq!(settings.palette.len(), 12);
        assert_eq!(settings.playback_rates.last(), Some(&0.0));
        assert_eq!(settings.default_stroke_width, 8.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"clip_pre_seconds": 8, "unknown": true}"#).unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.clip_pre_seconds, 8.0);
        assert_eq!(settings.clip_post_seconds, 5.0);
        assert_eq!(settings.highlights_folder, "Highlights");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            ffmpeg_program: "/usr/local/bin/ffmpeg".into(),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
