//! Artifact reader
//!
//! Reads an artifact directory in a fixed order:
//! 1. Check the path is a readable directory
//! 2. Read and gate the version marker (nothing else is opened on failure)
//! 3. Read `metadata.json`, verify it against `metadata.crc32` when present
//! 4. Parse descriptor records and validate them

use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::Path;

use log::debug;

use crate::error::{ArtifactError, ArtifactResult, CorruptReason, FormatError};
use crate::format::{self, MetadataRecord, CHECKSUM_FILE, METADATA_FILE, VERSION_FILE};
use crate::metadata::ModuleMetadata;

/// Reads artifact directories against a supported version range.
#[derive(Debug, Clone)]
pub struct ArtifactReader {
    versions: RangeInclusive<u32>,
    verify_checksum: bool,
}

impl ArtifactReader {
    /// Reader accepting every version in [`format::supported_versions`],
    /// with checksum verification on.
    pub fn new() -> Self {
        Self {
            versions: format::supported_versions(),
            verify_checksum: true,
        }
    }

    /// Restrict the accepted format versions.
    pub fn with_versions(mut self, versions: RangeInclusive<u32>) -> Self {
        self.versions = versions;
        self
    }

    /// Enable or disable `metadata.crc32` verification.
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn versions(&self) -> &RangeInclusive<u32> {
        &self.versions
    }

    /// Read and validate the artifact at `dir`.
    pub fn read(&self, dir: &Path) -> ArtifactResult<ModuleMetadata> {
        check_directory(dir)?;

        let version = self.read_version(dir)?;
        debug!(
            "artifact {}: format version {} accepted",
            dir.display(),
            version
        );

        let metadata_path = dir.join(METADATA_FILE);
        let bytes = fs::read(&metadata_path).map_err(|e| ArtifactError::io(&metadata_path, e))?;

        if self.verify_checksum {
            verify_checksum(dir, &bytes)?;
        }

        let record: MetadataRecord = serde_json::from_slice(&bytes)
            .map_err(|e| ArtifactError::corrupt(&metadata_path, CorruptReason::Malformed(e)))?;

        if record.format_version != version {
            return Err(ArtifactError::corrupt(
                &metadata_path,
                CorruptReason::VersionDisagreement {
                    marker: version,
                    embedded: record.format_version,
                },
            ));
        }

        let metadata = ModuleMetadata::from_record(record)
            .map_err(|reason| ArtifactError::corrupt(&metadata_path, reason))?;

        debug!(
            "artifact {}: {} kernel(s), {} field(s)",
            dir.display(),
            metadata.kernels.len(),
            metadata.fields.len()
        );

        Ok(metadata)
    }

    /// Read and gate only the version marker.
    pub fn read_version(&self, dir: &Path) -> ArtifactResult<u32> {
        let marker_path = dir.join(VERSION_FILE);
        let text = match fs::read_to_string(&marker_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FormatError::MissingMarker(marker_path).into());
            }
            Err(e) => {
                return Err(FormatError::UnreadableMarker {
                    path: marker_path,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let version = format::parse_version_marker(&text).map_err(|reason| {
            FormatError::UnreadableMarker {
                path: marker_path.clone(),
                reason,
            }
        })?;

        if !self.versions.contains(&version) {
            return Err(FormatError::Unsupported {
                found: version,
                min: *self.versions.start(),
                max: *self.versions.end(),
            }
            .into());
        }

        Ok(version)
    }
}

impl Default for ArtifactReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the artifact at `dir` with the default reader.
pub fn read_artifact(dir: impl AsRef<Path>) -> ArtifactResult<ModuleMetadata> {
    ArtifactReader::new().read(dir.as_ref())
}

fn check_directory(dir: &Path) -> ArtifactResult<()> {
    let meta = fs::metadata(dir).map_err(|e| ArtifactError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(ArtifactError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

fn verify_checksum(dir: &Path, bytes: &[u8]) -> ArtifactResult<()> {
    let checksum_path = dir.join(CHECKSUM_FILE);
    let text = match fs::read_to_string(&checksum_path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ArtifactError::io(&checksum_path, e)),
    };

    let expected = format::parse_checksum(&text).ok_or_else(|| {
        ArtifactError::corrupt(
            &checksum_path,
            CorruptReason::InvalidChecksum(text.trim().to_string()),
        )
    })?;
    let actual = format::checksum(bytes);
    if expected != actual {
        return Err(ArtifactError::corrupt(
            dir.join(METADATA_FILE),
            CorruptReason::ChecksumMismatch { expected, actual },
        ));
    }
    Ok(())
}
