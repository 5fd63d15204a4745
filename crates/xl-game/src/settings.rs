use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::{GameError, Result};
use crate::language::ClientLanguage;

const SETTINGS_FILE: &str = "settings.toml";

/// User facing launcher settings, persisted as TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub game_path: PathBuf,
    pub language: ClientLanguage,
    pub dx11: bool,
    pub encrypt_arguments: bool,
    pub steam_service_account: bool,
    pub additional_arguments: String,
    pub use_uid_cache: bool,
    pub force_base_version: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            game_path: PathBuf::new(),
            language: ClientLanguage::English,
            dx11: true,
            encrypt_arguments: true,
            steam_service_account: false,
            additional_arguments: String::new(),
            use_uid_cache: false,
            force_base_version: false,
        }
    }
}

impl LauncherSettings {
    /// Loads settings from `path`; a missing file yields the defaults.
    #[instrument(level = "debug")]
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(GameError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        toml::from_str(&content).map_err(|e| GameError::SettingsParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GameError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let toml = toml::to_string_pretty(self)?;
        tokio::fs::write(path, toml)
            .await
            .map_err(|e| GameError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        info!("Saved launcher settings to {}", path.display());
        Ok(())
    }

    /// Platform data directory for launcher state (settings, uid cache)
    pub fn data_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "xl-launcher", "xl-launcher")
            .ok_or(GameError::ConfigDirUnavailable)?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(SETTINGS_FILE))
    }
}
