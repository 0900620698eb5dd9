//! Converter settings
//!
//! Persisted as JSON in the platform config directory
//! (`~/.config/ncmdump/settings.json` on Linux). Missing or unreadable files
//! fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CHUNK_SIZE: usize = 0x8000;
const MIN_CHUNK_SIZE: usize = 1024;
const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Options controlling a single conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// Write title/artist/album into the output's tag
    pub embed_tags: bool,
    /// Also embed cover art when the container has one
    pub embed_cover: bool,
    /// Bytes decrypted per iteration
    pub chunk_size: usize,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            embed_tags: true,
            embed_cover: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ConverterSettings {
    const SETTINGS_FILE: &'static str = "settings.json";

    /// Chunk size clamped to a sane range
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }

    /// Get the config directory (~/.config/ncmdump/ on Linux)
    pub fn config_dir() -> Result<PathBuf, String> {
        dirs::config_dir()
            .map(|d| d.join("ncmdump"))
            .ok_or_else(|| "Could not determine config directory".to_string())
    }

    pub fn settings_path() -> Result<PathBuf, String> {
        Self::config_dir().map(|d| d.join(Self::SETTINGS_FILE))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path().and_then(|p| Self::load_from(&p)) {
            Ok(settings) => {
                log::debug!("Loaded converter settings from disk");
                settings
            }
            Err(e) => {
                log::debug!("Using default converter settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Err("Settings file not found".to_string());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse settings: {}", e))
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), String> {
        let path = Self::settings_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        log::debug!("Saved converter settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = ConverterSettings::default();
        assert!(settings.embed_tags);
        assert!(settings.embed_cover);
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_chunk_size_is_clamped() {
        let mut settings = ConverterSettings::default();
        settings.chunk_size = 1;
        assert_eq!(settings.effective_chunk_size(), MIN_CHUNK_SIZE);
        settings.chunk_size = usize::MAX;
        assert_eq!(settings.effective_chunk_size(), MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");

        let settings = ConverterSettings {
            embed_tags: false,
            embed_cover: true,
            chunk_size: 4096,
        };
        settings.save_to(&path).unwrap();

        let loaded = ConverterSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults_for_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"embed_cover": false}"#).unwrap();

        let loaded = ConverterSettings::load_from(&path).unwrap();
        assert!(loaded.embed_tags);
        assert!(!loaded.embed_cover);
        assert_eq!(loaded.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ConverterSettings::load_from(&temp_dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_config_dir_contains_app_name() {
        if let Ok(dir) = ConverterSettings::config_dir() {
            assert!(dir.ends_with("ncmdump"));
        }
    }
}
