use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::arguments::{ArgumentBuilder, TickSource};
use crate::errors::{GameError, Result};
use crate::language::ClientLanguage;
use crate::repository::Repository;

/// Inputs for assembling one game launch
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub session_id: String,
    pub region: i32,
    pub expansion_level: u32,
    pub is_steam_service_account: bool,
    /// Free-form `key=value` pairs appended after the standard arguments
    pub additional_arguments: String,
    pub language: ClientLanguage,
    pub dx11: bool,
    pub encrypt_arguments: bool,
}

/// Everything the process layer needs to start the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub executable: PathBuf,
    pub working_dir: PathBuf,
    pub arguments: String,
    pub environment: BTreeMap<String, String>,
}

/// Splits `key=value` pairs out of user supplied text.
///
/// A key is the whole run of text before `=`, trimmed, so `a b=1` yields the
/// key `a b`. Values end at the first whitespace. Text that does not form a
/// pair is skipped and scanning resumes after its `=`.
pub fn parse_additional_arguments(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = input;

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let value_end = after.find(char::is_whitespace).unwrap_or(after.len());
        let value = &after[..value_end];

        if key.is_empty() || value.is_empty() {
            rest = &rest[eq + 1..];
            continue;
        }

        pairs.push((key.to_string(), value.to_string()));
        rest = &after[value_end..];
    }

    pairs
}

/// Builds the executable path, environment and argument string for a launch.
#[instrument(skip(options, ticks), fields(dx11 = options.dx11, encrypt = options.encrypt_arguments))]
pub async fn build_launch_plan(
    game_path: &Path,
    options: &LaunchOptions,
    ticks: &dyn TickSource,
) -> Result<LaunchPlan> {
    let working_dir = game_path.join("game");
    let executable = working_dir.join(if options.dx11 {
        "ffxiv_dx11.exe"
    } else {
        "ffxiv.exe"
    });

    let game_ver = Repository::Ffxiv.get_ver(game_path).await?;

    let mut environment = BTreeMap::new();
    let mut builder = ArgumentBuilder::new()
        .append("DEV.DataPathType", "1")
        .append(
            "DEV.MaxEntitledExpansionID",
            options.expansion_level.to_string(),
        )
        .append("DEV.TestSID", options.session_id.as_str())
        .append("DEV.UseSqPack", "1")
        .append("SYS.Region", options.region.to_string())
        .append("language", options.language.id().to_string())
        .append("ver", game_ver);

    if options.is_steam_service_account {
        environment.insert("IS_FFXIV_LAUNCH_FROM_STEAM".to_string(), "1".to_string());
        builder.push("IsSteam", "1");
    }

    let extra = parse_additional_arguments(&options.additional_arguments);
    debug!("Appending {} additional arguments", extra.len());
    builder.extend(extra);

    if tokio::fs::metadata(&executable).await.is_err() {
        return Err(GameError::BinaryNotPresent { path: executable });
    }

    let arguments = if options.encrypt_arguments {
        builder.build_encrypted(ticks)
    } else {
        builder.build_plain()
    };

    info!("Prepared launch of {}", executable.display());

    Ok(LaunchPlan {
        executable,
        working_dir,
        arguments,
        environment,
    })
}
