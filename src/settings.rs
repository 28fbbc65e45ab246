use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::InputSource;
use crate::calibration::{RangeSetting, ViewConfig};
use crate::render::ScopeSettings;

/// Returns the path to the settings file: `~/.config/tdr-scope/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tdr-scope");
    path.push("settings.json");
    path
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Stop the display sleeping while the scope is in the foreground
    pub keep_screen: bool,
    pub dark: bool,
    /// Draw the scope graticule
    pub show_grid: bool,

    pub range: RangeSetting,

    /// Input device name, system default when unset
    pub input_device: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            keep_screen: false,
            dark: false,
            show_grid: true,
            range: RangeSetting::default(),
            input_device: None,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) {
        self.save_to(&settings_path());
    }

    fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to write settings: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Fresh display configuration for these settings
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig::new(self.range, self.dark)
    }

    pub fn scope_settings(&self) -> ScopeSettings {
        ScopeSettings {
            show_graticule: self.show_grid,
            ..ScopeSettings::for_theme(self.dark)
        }
    }

    pub fn input_source(&self) -> InputSource {
        match &self.input_device {
            Some(name) => InputSource::Named(name.clone()),
            None => InputSource::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("tdr-scope-test-{}-{}", std::process::id(), name));
        path.push("settings.json");
        path
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{ "dark": true }"#).unwrap();
        assert!(settings.dark);
        assert!(!settings.keep_screen);
        assert!(settings.show_grid);
        assert_eq!(settings.range, RangeSetting::default());
        assert_eq!(settings.input_source(), InputSource::Default);
    }

    #[test]
    fn test_grid_setting_reaches_scope() {
        let settings = AppSettings::default();
        assert!(settings.scope_settings().show_graticule);

        let hidden = AppSettings {
            show_grid: false,
            dark: true,
            ..AppSettings::default()
        };
        let scope = hidden.scope_settings();
        assert!(!scope.show_graticule);
        assert_eq!(scope.background, ScopeSettings::for_theme(true).background);
    }

    #[test]
    fn test_out_of_range_index_falls_back() {
        let settings: AppSettings = serde_json::from_str(r#"{ "range": 12 }"#).unwrap();
        assert_eq!(settings.range, RangeSetting::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("roundtrip");
        let settings = AppSettings {
            keep_screen: true,
            dark: true,
            show_grid: false,
            range: RangeSetting::new(0).unwrap(),
            input_device: Some("USB Audio".into()),
        };

        settings.save_to(&path);
        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.input_source(), InputSource::Named("USB Audio".into()));

        let config = loaded.view_config();
        assert!(config.points);
        assert!(config.dark);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_unreadable_file_gives_defaults() {
        let path = temp_path("garbage");
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).unwrap();
        }
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
        assert_eq!(AppSettings::load_from(&temp_path("absent")), AppSettings::default());

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
