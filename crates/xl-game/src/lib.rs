//! Local game install handling for the launcher: version files, the
//! tamper-evidence hash sent to the patch server, and the (optionally
//! encrypted) command line handed to the game executable.

pub mod arguments;
pub mod blowfish;
mod blowfish_tables;
pub mod errors;
pub mod language;
pub mod launch;
pub mod repository;
pub mod settings;
pub mod version;

pub use arguments::{ArgumentBuilder, FixedTicks, SystemTicks, TickSource};
pub use errors::{GameError, Result};
pub use language::ClientLanguage;
pub use launch::{LaunchOptions, LaunchPlan, build_launch_plan};
pub use repository::{BASE_GAME_VERSION, Repository};
pub use settings::LauncherSettings;
pub use version::{boot_version_hash, version_report};
