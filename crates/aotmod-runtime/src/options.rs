//! Loader options (TOML)
//!
//! ```toml
//! min_format_version = 1
//! max_format_version = 5
//! verify_checksum = true
//! require_declared_fields = false
//! ```
//!
//! Every key is optional.

use std::path::Path;

use aotmod_artifact::{ArtifactReader, MAX_FORMAT_VERSION, MIN_FORMAT_VERSION};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while reading loader options
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Failed to read the options file
    #[error("failed to read loader options: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("failed to parse loader options: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are inconsistent
    #[error("invalid loader options: {0}")]
    Invalid(String),
}

/// Knobs for reading and binding artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderOptions {
    /// Oldest format version to accept
    pub min_format_version: u32,

    /// Newest format version to accept
    pub max_format_version: u32,

    /// Verify `metadata.crc32` when the artifact has one
    pub verify_checksum: bool,

    /// Fail binding when the backend has no declaration for a module field
    pub require_declared_fields: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            min_format_version: MIN_FORMAT_VERSION,
            max_format_version: MAX_FORMAT_VERSION,
            verify_checksum: true,
            require_declared_fields: false,
        }
    }
}

impl LoaderOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, OptionsError> {
        let options: LoaderOptions = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The version window must be non-empty and inside what the reader
    /// understands.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.min_format_version > self.max_format_version {
            return Err(OptionsError::Invalid(format!(
                "min_format_version {} is greater than max_format_version {}",
                self.min_format_version, self.max_format_version
            )));
        }
        if self.min_format_version < MIN_FORMAT_VERSION
            || self.max_format_version > MAX_FORMAT_VERSION
        {
            return Err(OptionsError::Invalid(format!(
                "format versions {}..={} fall outside the supported range {}..={}",
                self.min_format_version,
                self.max_format_version,
                MIN_FORMAT_VERSION,
                MAX_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Artifact reader configured from these options.
    pub fn reader(&self) -> ArtifactReader {
        ArtifactReader::new()
            .with_versions(self.min_format_version..=self.max_format_version)
            .verify_checksum(self.verify_checksum)
    }
}
