//! On-disk artifact layout
//!
//! An AOT artifact is a directory written by the offline compiler:
//!
//! ```text
//! <artifact>/
//! ├── VERSION          ← decimal format version, read before anything else
//! ├── metadata.json    ← kernel and field descriptor records
//! └── metadata.crc32   ← optional CRC32 of metadata.json (8 hex digits)
//! ```
//!
//! Format versions 1 through 5 share this layout. Newer revisions only add
//! optional keys to `metadata.json`, which older readers ignore.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Name of the version marker file.
pub const VERSION_FILE: &str = "VERSION";

/// Name of the descriptor record file.
pub const METADATA_FILE: &str = "metadata.json";

/// Name of the optional checksum file.
pub const CHECKSUM_FILE: &str = "metadata.crc32";

/// Oldest format version this reader understands.
pub const MIN_FORMAT_VERSION: u32 = 1;

/// Newest format version this reader understands.
pub const MAX_FORMAT_VERSION: u32 = 5;

/// Version stamped by [`crate::ArtifactWriter`] when the caller does not pick one.
pub const CURRENT_FORMAT_VERSION: u32 = MAX_FORMAT_VERSION;

/// Full range of format versions this reader understands.
pub fn supported_versions() -> RangeInclusive<u32> {
    MIN_FORMAT_VERSION..=MAX_FORMAT_VERSION
}

/// Parse the contents of the version marker.
///
/// Surrounding whitespace is ignored; anything else must be a non-negative
/// decimal integer.
pub fn parse_version_marker(text: &str) -> Result<u32, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("marker is empty".to_string());
    }
    trimmed
        .parse::<u32>()
        .map_err(|e| format!("`{}` is not a format version: {}", trimmed, e))
}

/// Encode a version marker.
pub fn encode_version_marker(version: u32) -> String {
    format!("{}\n", version)
}

/// CRC32 of the metadata record bytes.
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Parse the contents of the checksum file.
pub fn parse_checksum(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.len() != 8 {
        return None;
    }
    u32::from_str_radix(trimmed, 16).ok()
}

/// Encode a checksum file.
pub fn encode_checksum(value: u32) -> String {
    format!("{:08x}\n", value)
}

/// Serialized form of `metadata.json`.
///
/// Type tags stay strings and dimensions stay signed here so that bad values
/// surface as descriptor corruption instead of generic JSON errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub format_version: u32,

    /// Target architecture the kernels were compiled for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    #[serde(default)]
    pub kernels: Vec<KernelRecord>,

    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

/// Serialized kernel descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelRecord {
    pub name: String,
    pub entry_symbol: String,

    /// Argument type tags in call order
    #[serde(default)]
    pub args: Vec<String>,
}

/// Serialized field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub dtype: String,

    /// Dimensions, outermost first; empty for a scalar field
    #[serde(default)]
    pub shape: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_marker() {
        assert_eq!(parse_version_marker("3"), Ok(3));
        assert_eq!(parse_version_marker("  5\n"), Ok(5));
        assert_eq!(encode_version_marker(4), "4\n");
    }

    #[test]
    fn test_version_marker_rejects_garbage() {
        assert!(parse_version_marker("").is_err());
        assert!(parse_version_marker("\n").is_err());
        assert!(parse_version_marker("v2").is_err());
        assert!(parse_version_marker("-1").is_err());
        assert!(parse_version_marker("1.0").is_err());
    }

    #[test]
    fn test_checksum_text() {
        let value = checksum(b"{}");
        let text = encode_checksum(value);
        assert_eq!(text.trim().len(), 8);
        assert_eq!(parse_checksum(&text), Some(value));
    }

    #[test]
    fn test_checksum_text_rejects_garbage() {
        assert_eq!(parse_checksum("xyz"), None);
        assert_eq!(parse_checksum("123"), None);
        assert_eq!(parse_checksum("0000000g"), None);
    }

    #[test]
    fn test_record_defaults() {
        let record: MetadataRecord = serde_json::from_str(
            r#"{"format_version": 2, "kernels": [{"name": "k", "entry_symbol": "k_sym"}]}"#,
        )
        .unwrap();

        assert_eq!(record.arch, None);
        assert!(record.fields.is_empty());
        assert!(record.kernels[0].args.is_empty());
    }

    #[test]
    fn test_record_ignores_unknown_keys() {
        let record: MetadataRecord = serde_json::from_str(
            r#"{"format_version": 5, "producer": "offline-compiler 9.1", "fields": []}"#,
        )
        .unwrap();
        assert_eq!(record.format_version, 5);
    }
}
