//! This module handles [`AppConfig`], which gathers the config of every part of the app.

use crate::{music::MusicConfig, overlay::OverlayConfig, scene::SceneConfig};
use dx_gesture::GestureConfig;
use dx_particles::FieldConfig;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

/// The environment variable holding the path of a RON config file.
pub const CONFIG_PATH_VAR: &str = "DREAMY_XMAS_CONFIG";

/// An error from loading an [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// The config of the whole app. Every field falls back to its default when missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub field: FieldConfig,
    pub gesture: GestureConfig,
    pub scene: SceneConfig,
    pub music: MusicConfig,
    pub overlay: OverlayConfig,
}

impl AppConfig {
    /// Parse a config from RON.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Print this config as pretty RON, which [`Self::from_ron`] can read back.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default().struct_names(true))
    }

    /// Read and parse a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load the config from the file named by [`CONFIG_PATH_VAR`], or use the default if that
    /// isn't set or the file can't be used. Nothing is ever written back.
    #[cfg(not(target_family = "wasm"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(CONFIG_PATH_VAR) else {
            tracing::debug!("No config file given, using the default config");
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!(%path, "Loaded config");
                config
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to load config, using the default");
                Self::default()
            }
        }
    }

    /// The web build has no config file.
    #[cfg(target_family = "wasm")]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trip() {
        let config = AppConfig::default();
        let text = config.to_ron().unwrap();
        assert_eq!(AppConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = AppConfig::from_ron("(field: (count: 12), music: (volume: 0.2))").unwrap();

        assert_eq!(config.field.count, 12);
        assert_eq!(config.field.height, FieldConfig::default().height);
        assert_eq!(config.music.volume, 0.2);
        assert_eq!(config.music.src, MusicConfig::default().src);
        assert_eq!(config.gesture, GestureConfig::default());
    }

    #[test]
    fn bad_files_are_errors() {
        let missing = std::env::temp_dir().join("dreamy-xmas-config-that-does-not-exist.ron");
        assert!(matches!(AppConfig::from_file(missing), Err(ConfigError::Read { .. })));

        assert!(AppConfig::from_ron("(field: (count: \"many\"))").is_err());
    }
}
