//! Settings management
//!
//! Settings files are JSON. A missing file means "use defaults"; a file
//! that exists but doesn't parse is an error the caller has to look at.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telemetry: TelemetrySettings,
    pub persistence: PersistenceSettings,
    /// Frames per second the headless host drives ticks at.
    pub frame_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub endpoint: String,
    /// Seconds between mood samples.
    pub interval_seconds: f64,
    /// Samples buffered before new ones are dropped.
    pub queue_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub save_path: PathBuf,
    pub autosave_interval_seconds: f64,
    pub queue_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry: TelemetrySettings::default(),
            persistence: PersistenceSettings::default(),
            frame_rate: 60,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:8000/update_qualia".to_string(),
            interval_seconds: 1.0,
            queue_depth: 16,
        }
    }
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("saves/cadence_save.json"),
            autosave_interval_seconds: 60.0,
            queue_depth: 4,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        load_or_default(path)
    }
}

/// Read a JSON settings file, falling back to `T::default()` when the file
/// does not exist.
pub fn load_or_default<T>(path: &Path) -> Result<T, SettingsError>
where
    T: DeserializeOwned + Default,
{
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no settings file, using defaults");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write<T: Serialize>(path: &Path, value: &T) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.persistence.autosave_interval_seconds, 60.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "telemetry": { "enabled": false }, "frame_rate": 30 }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(!settings.telemetry.enabled);
        assert_eq!(settings.telemetry.endpoint, TelemetrySettings::default().endpoint);
        assert_eq!(settings.frame_rate, 30);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/settings.json");
        let mut settings = Settings::default();
        settings.frame_rate = 144;
        write(&path, &settings).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }
}
