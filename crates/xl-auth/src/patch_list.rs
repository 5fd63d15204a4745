use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, XlAuthError};

/// One patch file the client has to download before it is current
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchListEntry {
    pub version_id: String,
    pub length: u64,
    pub hash_type: Option<String>,
    pub hash_block_size: Option<u64>,
    #[serde(default)]
    pub hashes: Vec<String>,
    pub url: String,
}

fn parse_number(field: &str, name: &str, line: &str) -> Result<u64> {
    field.parse().map_err(|_| {
        XlAuthError::InvalidResponse(format!("Patch list {} is not a number: {:?}", name, line))
    })
}

fn parse_entry(line: &str) -> Result<PatchListEntry> {
    let fields: Vec<&str> = line.split('\t').collect();

    match fields.as_slice() {
        // length, total, count, parts, version, hash type, block size, hashes, url
        [length, _, _, _, version, hash_type, block_size, hashes, url] => Ok(PatchListEntry {
            version_id: version.to_string(),
            length: parse_number(length, "length", line)?,
            hash_type: Some(hash_type.to_string()),
            hash_block_size: Some(parse_number(block_size, "hash block size", line)?),
            hashes: hashes
                .split(',')
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect(),
            url: url.to_string(),
        }),
        // Boot patches carry no hashes
        [length, _, _, _, version, url] => Ok(PatchListEntry {
            version_id: version.to_string(),
            length: parse_number(length, "length", line)?,
            hash_type: None,
            hash_block_size: None,
            hashes: Vec::new(),
            url: url.to_string(),
        }),
        _ => Err(XlAuthError::InvalidResponse(format!(
            "Unexpected patch list entry with {} fields: {:?}",
            fields.len(),
            line
        ))),
    }
}

fn is_envelope_line(line: &str) -> bool {
    line.is_empty()
        || line.starts_with("--")
        || (!line.contains('\t') && line.contains(": "))
}

/// Parses a patch list body from the version services, in server order.
pub fn parse(body: &str) -> Result<Vec<PatchListEntry>> {
    let entries = body
        .lines()
        .map(str::trim_end)
        .filter(|line| !is_envelope_line(line))
        .map(parse_entry)
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} patch list entries", entries.len());
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const GAME_PATCH_BODY: &str = "--477D80B1_38BC_41d4_8B48_5273ADB89CAC\r\n\
Content-Type: application/octet-stream\r\n\
Content-Location: ffxivpatch/4e9a232b/metainfo/D2024.05.31.0000.0000.http\r\n\
X-Patch-Length: 1479\r\n\
\r\n\
53592360\t71806976\t2\t2\t2024.05.31.0000.0001\tsha1\t50000000\tabc,def\thttp://patch-dl.ffxiv.com/game/4e9a232b/D2024.05.31.0000.0001.patch\r\n\
1024\t2048\t1\t1\t2024.06.01.0000.0000\tsha1\t50000000\t0123\thttp://patch-dl.ffxiv.com/game/4e9a232b/D2024.06.01.0000.0000.patch\r\n\
--477D80B1_38BC_41d4_8B48_5273ADB89CAC--\r\n";

    #[test]
    fn test_parse_game_patch_list() {
        let entries = parse(GAME_PATCH_BODY).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version_id, "2024.05.31.0000.0001");
        assert_eq!(entries[0].length, 53592360);
        assert_eq!(entries[0].hash_type.as_deref(), Some("sha1"));
        assert_eq!(entries[0].hash_block_size, Some(50000000));
        assert_eq!(entries[0].hashes, vec!["abc", "def"]);
        assert!(entries[1].url.ends_with("D2024.06.01.0000.0000.patch"));
    }

    #[test]
    fn test_parse_boot_patch_list() {
        let body = "--boundary\r\nContent-Type: application/octet-stream\r\n\r\n\
22927069\t22927069\t1\t1\t2024.04.10.0000.0001\thttp://patch-dl.ffxiv.com/boot/2b5cbc63/D2024.04.10.0000.0001.patch\r\n\
--boundary--\r\n";

        let entries = parse(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash_type, None);
        assert!(entries[0].hashes.is_empty());
        assert_eq!(entries[0].version_id, "2024.04.10.0000.0001");
    }

    #[test]
    fn test_empty_body_has_no_entries() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_entry_is_protocol_error() {
        let result = parse("not\ta\tpatch\tline");
        assert!(matches!(result, Err(XlAuthError::InvalidResponse(_))));

        let result = parse("abc\t1\t1\t1\tver\thttp://x");
        assert!(matches!(result, Err(XlAuthError::InvalidResponse(_))));
    }
}
