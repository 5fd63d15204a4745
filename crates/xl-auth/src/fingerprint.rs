use sha1::{Digest, Sha1};
use sysinfo::System;

use crate::config::{ClientPlatform, USER_AGENT_MAC, USER_AGENT_WINDOWS_PREFIX};

/// Stable facts about the local machine that identify it to the login service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFingerprint {
    pub machine_name: String,
    pub user_name: String,
    pub os_version: String,
    pub processor_count: usize,
}

impl MachineFingerprint {
    pub fn from_system() -> Self {
        let user_name = std::env::var("USERNAME")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_default();
        let processor_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            machine_name: System::host_name().unwrap_or_default(),
            user_name,
            os_version: System::long_os_version().unwrap_or_default(),
            processor_count,
        }
    }

    /// Ten hex characters: a one byte checksum followed by the first four
    /// bytes of the SHA-1 of the UTF-16LE encoded machine facts.
    ///
    /// The checksum makes the five bytes sum to zero (mod 256).
    pub fn computer_id(&self) -> String {
        let source = format!(
            "{}{}{}{}",
            self.machine_name, self.user_name, self.os_version, self.processor_count
        );
        let utf16: Vec<u8> = source.encode_utf16().flat_map(u16::to_le_bytes).collect();
        let digest = Sha1::digest(&utf16);

        let mut bytes = [0u8; 5];
        bytes[1..].copy_from_slice(&digest[..4]);
        let sum = bytes[1..].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        bytes[0] = sum.wrapping_neg();

        hex::encode(bytes)
    }
}

/// User agent for the login pages. Mac mode uses a fixed string and never
/// touches the fingerprint.
pub fn oauth_user_agent(
    platform: ClientPlatform,
    fingerprint: impl FnOnce() -> MachineFingerprint,
) -> String {
    match platform {
        ClientPlatform::Mac => USER_AGENT_MAC.to_string(),
        ClientPlatform::Windows => {
            format!("{}{})", USER_AGENT_WINDOWS_PREFIX, fingerprint().computer_id())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MachineFingerprint {
        MachineFingerprint {
            machine_name: "DESKTOP-1".to_string(),
            user_name: "player".to_string(),
            os_version: "Microsoft Windows NT 10.0.19045.0".to_string(),
            processor_count: 8,
        }
    }

    #[test]
    fn test_computer_id_shape_and_checksum() {
        let id = sample().computer_id();
        assert_eq!(id.len(), 10);

        let bytes = hex::decode(&id).unwrap();
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn test_computer_id_is_stable_and_input_sensitive() {
        assert_eq!(sample().computer_id(), sample().computer_id());

        let mut other = sample();
        other.processor_count = 16;
        assert_ne!(sample().computer_id(), other.computer_id());
    }

    #[test]
    fn test_windows_user_agent() {
        let ua = oauth_user_agent(ClientPlatform::Windows, sample);
        assert!(ua.starts_with("SQEXAuthor/2.0.0(Windows 6.2; ja-jp; "));
        assert!(ua.ends_with(&format!("{})", sample().computer_id())));
    }

    #[test]
    fn test_mac_user_agent_skips_fingerprint() {
        let ua = oauth_user_agent(ClientPlatform::Mac, || {
            panic!("fingerprint must not be computed in mac mode")
        });
        assert_eq!(ua, "macSQEXAuthor/2.0.0(MacOSX; ja-jp)");
    }
}
