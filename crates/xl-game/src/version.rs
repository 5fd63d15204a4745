use std::path::Path;

use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

use crate::errors::{GameError, Result};
use crate::repository::{BASE_GAME_VERSION, Repository};

/// Boot binaries covered by the tamper-evidence hash, in wire order
pub const BOOT_FILES_TO_HASH: [&str; 6] = [
    "ffxivboot.exe",
    "ffxivboot64.exe",
    "ffxivlauncher.exe",
    "ffxivlauncher64.exe",
    "ffxivupdater.exe",
    "ffxivupdater64.exe",
];

/// `{filename}/{length}/{sha1}` for one boot binary
async fn hash_boot_file(game_path: &Path, file_name: &str) -> Result<String> {
    let path = game_path.join("boot").join(file_name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| GameError::binary_read(&path, e))?;

    let digest = Sha1::digest(&bytes);
    Ok(format!("{}/{}/{}", file_name, bytes.len(), hex::encode(digest)))
}

/// Boot version followed by `=` and the hash of every boot binary.
///
/// Any missing binary aborts with [`GameError::BinaryNotPresent`].
#[instrument(level = "debug")]
pub async fn boot_version_hash(game_path: &Path) -> Result<String> {
    let mut parts = Vec::with_capacity(BOOT_FILES_TO_HASH.len());
    for file_name in BOOT_FILES_TO_HASH {
        parts.push(hash_boot_file(game_path, file_name).await?);
    }

    let boot_ver = Repository::Boot.get_ver(game_path).await?;
    Ok(format!("{}={}", boot_ver, parts.join(",")))
}

/// Body sent to the game version service: the boot hash line plus one
/// `exN\t{version}` line per entitled expansion.
///
/// `force_base` reports every expansion at [`BASE_GAME_VERSION`] so the
/// server answers with the full patch chain.
#[instrument(level = "debug")]
pub async fn version_report(
    game_path: &Path,
    expansion_level: u32,
    force_base: bool,
) -> Result<String> {
    let mut report = boot_version_hash(game_path).await?;

    for level in 1..=expansion_level {
        let Some(expansion) = Repository::expansion(level) else {
            debug!("Ignoring unknown expansion level {}", level);
            break;
        };

        let version = if force_base {
            BASE_GAME_VERSION.to_string()
        } else {
            expansion.get_ver(game_path).await?
        };

        report.push('\n');
        report.push_str(expansion.tag());
        report.push('\t');
        report.push_str(&version);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fake_install() -> TempDir {
        let temp = TempDir::new().unwrap();
        let boot = temp.path().join("boot");
        tokio::fs::create_dir_all(&boot).await.unwrap();

        for (i, name) in BOOT_FILES_TO_HASH.iter().enumerate() {
            tokio::fs::write(boot.join(name), format!("binary-{}", i))
                .await
                .unwrap();
        }

        Repository::Boot
            .set_ver(temp.path(), "2024.03.07.0000.0001")
            .await
            .unwrap();
        temp
    }

    #[tokio::test]
    async fn test_boot_hash_format() {
        let install = fake_install().await;
        let hash = boot_version_hash(install.path()).await.unwrap();

        let (ver, files) = hash.split_once('=').unwrap();
        assert_eq!(ver, "2024.03.07.0000.0001");

        let entries: Vec<&str> = files.split(',').collect();
        assert_eq!(entries.len(), BOOT_FILES_TO_HASH.len());

        // sha1("binary-0")
        let expected = format!(
            "ffxivboot.exe/8/{}",
            hex::encode(Sha1::digest(b"binary-0"))
        );
        assert_eq!(entries[0], expected);
        assert!(entries[5].starts_with("ffxivupdater64.exe/8/"));
    }

    #[tokio::test]
    async fn test_changing_one_byte_changes_hash() {
        let install = fake_install().await;
        let before = boot_version_hash(install.path()).await.unwrap();

        tokio::fs::write(install.path().join("boot/ffxivlauncher64.exe"), "binary-X")
            .await
            .unwrap();
        let after = boot_version_hash(install.path()).await.unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let install = fake_install().await;
        tokio::fs::remove_file(install.path().join("boot/ffxivupdater.exe"))
            .await
            .unwrap();

        let result = boot_version_hash(install.path()).await;
        match result {
            Err(GameError::BinaryNotPresent { path }) => {
                assert!(path.ends_with("boot/ffxivupdater.exe"));
            }
            other => panic!("expected BinaryNotPresent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_version_report_lists_entitled_expansions() {
        let install = fake_install().await;
        Repository::Ex1
            .set_ver(install.path(), "2024.01.01.0000.0000")
            .await
            .unwrap();

        let report = version_report(install.path(), 2, false).await.unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "ex1\t2024.01.01.0000.0000");
        assert_eq!(lines[2], format!("ex2\t{}", BASE_GAME_VERSION));
    }

    #[tokio::test]
    async fn test_version_report_force_base() {
        let install = fake_install().await;
        Repository::Ex1
            .set_ver(install.path(), "2024.01.01.0000.0000")
            .await
            .unwrap();

        let report = version_report(install.path(), 1, true).await.unwrap();
        assert!(report.ends_with(&format!("\nex1\t{}", BASE_GAME_VERSION)));
    }

    #[tokio::test]
    async fn test_version_report_without_expansions() {
        let install = fake_install().await;
        let report = version_report(install.path(), 0, false).await.unwrap();
        assert!(!report.contains('\n'));
    }
}
