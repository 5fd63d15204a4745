use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while inspecting or preparing a local game install
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Required game binary is missing: {}", path.display())]
    BinaryNotPresent { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("Could not determine the configuration directory")]
    ConfigDirUnavailable,
}

impl GameError {
    /// Reading a required binary: a missing file is reported as such.
    pub(crate) fn binary_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::BinaryNotPresent { path };
        }
        Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
