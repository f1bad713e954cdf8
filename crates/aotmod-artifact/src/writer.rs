//! Artifact writer
//!
//! Reference encoder for the directory layout in [`crate::format`]. Offline
//! compilers and tests use it to emit artifacts the reader accepts.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{ArtifactError, ArtifactResult, FormatError};
use crate::format::{self, CHECKSUM_FILE, METADATA_FILE, VERSION_FILE};
use crate::metadata::ModuleMetadata;

/// Writes artifact directories.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    write_checksum: bool,
}

impl ArtifactWriter {
    /// Writer that also emits `metadata.crc32`.
    pub fn new() -> Self {
        Self {
            write_checksum: true,
        }
    }

    pub fn write_checksum(mut self, enabled: bool) -> Self {
        self.write_checksum = enabled;
        self
    }

    /// Write `metadata` into `dir`, creating the directory if needed.
    ///
    /// Nothing is written unless the format version is one the reader
    /// accepts and the descriptors validate.
    pub fn write(&self, dir: &Path, metadata: &ModuleMetadata) -> ArtifactResult<()> {
        let versions = format::supported_versions();
        if !versions.contains(&metadata.format_version) {
            return Err(FormatError::Unsupported {
                found: metadata.format_version,
                min: *versions.start(),
                max: *versions.end(),
            }
            .into());
        }
        metadata
            .validate()
            .map_err(|reason| ArtifactError::corrupt(dir.join(METADATA_FILE), reason))?;

        fs::create_dir_all(dir).map_err(|e| ArtifactError::io(dir, e))?;

        // Drop the marker of an artifact being overwritten before touching its records.
        let marker_path = dir.join(VERSION_FILE);
        if marker_path.exists() {
            fs::remove_file(&marker_path).map_err(|e| ArtifactError::io(&marker_path, e))?;
        }

        let mut bytes = serde_json::to_vec_pretty(&metadata.to_record())
            .map_err(|e| ArtifactError::io(dir.join(METADATA_FILE), e.into()))?;
        bytes.push(b'\n');

        let metadata_path = dir.join(METADATA_FILE);
        fs::write(&metadata_path, &bytes).map_err(|e| ArtifactError::io(&metadata_path, e))?;

        let checksum_path = dir.join(CHECKSUM_FILE);
        if self.write_checksum {
            let text = format::encode_checksum(format::checksum(&bytes));
            fs::write(&checksum_path, text).map_err(|e| ArtifactError::io(&checksum_path, e))?;
        } else if checksum_path.exists() {
            fs::remove_file(&checksum_path).map_err(|e| ArtifactError::io(&checksum_path, e))?;
        }

        // Marker last: a half-written directory has no version and is rejected.
        fs::write(
            &marker_path,
            format::encode_version_marker(metadata.format_version),
        )
        .map_err(|e| ArtifactError::io(&marker_path, e))?;

        debug!(
            "wrote artifact {} (format version {})",
            dir.display(),
            metadata.format_version
        );
        Ok(())
    }
}

impl Default for ArtifactWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `metadata` into `dir` with the default writer.
pub fn write_artifact(dir: impl AsRef<Path>, metadata: &ModuleMetadata) -> ArtifactResult<()> {
    ArtifactWriter::new().write(dir.as_ref(), metadata)
}
