use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{GameError, Result};

/// Version reported for a component that has never been patched
pub const BASE_GAME_VERSION: &str = "2012.01.01.0000.0000";

/// Independently versioned component of a game install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repository {
    Boot,
    Ffxiv,
    Ex1,
    Ex2,
    Ex3,
    Ex4,
}

impl Repository {
    pub const EXPANSIONS: [Repository; 4] = [Self::Ex1, Self::Ex2, Self::Ex3, Self::Ex4];

    /// Expansion for a 1-based entitlement level
    pub fn expansion(level: u32) -> Option<Self> {
        match level {
            1 => Some(Self::Ex1),
            2 => Some(Self::Ex2),
            3 => Some(Self::Ex3),
            4 => Some(Self::Ex4),
            _ => None,
        }
    }

    /// Short tag used in version reports (`ex1`..`ex4`)
    pub fn tag(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Ffxiv => "ffxiv",
            Self::Ex1 => "ex1",
            Self::Ex2 => "ex2",
            Self::Ex3 => "ex3",
            Self::Ex4 => "ex4",
        }
    }

    pub fn ver_file(self, game_path: &Path) -> PathBuf {
        match self {
            Self::Boot => game_path.join("boot").join("ffxivboot.ver"),
            Self::Ffxiv => game_path.join("game").join("ffxivgame.ver"),
            ex => game_path
                .join("game")
                .join("sqpack")
                .join(ex.tag())
                .join(format!("{}.ver", ex.tag())),
        }
    }

    /// Reads the installed version, falling back to [`BASE_GAME_VERSION`] when
    /// the component has no version file yet.
    pub async fn get_ver(self, game_path: &Path) -> Result<String> {
        let path = self.ver_file(game_path);

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No version file at {}, assuming base", path.display());
                Ok(BASE_GAME_VERSION.to_string())
            }
            Err(e) => Err(GameError::Io { path, source: e }),
        }
    }

    pub async fn set_ver(self, game_path: &Path, version: &str) -> Result<()> {
        let path = self.ver_file(game_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GameError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&path, version)
            .await
            .map_err(|e| GameError::Io { path, source: e })
    }
}
