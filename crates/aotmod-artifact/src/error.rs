//! Artifact error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::UnknownTypeTag;

/// Errors produced while reading or writing an artifact directory.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact path or one of its record files could not be accessed
    #[error("failed to access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact path exists but is not a directory
    #[error("artifact path `{}` is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Missing, unreadable or unsupported version marker
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A descriptor record is malformed
    #[error("corrupt artifact `{}`: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        reason: CorruptReason,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: CorruptReason) -> Self {
        ArtifactError::Corrupt {
            path: path.into(),
            reason,
        }
    }

    /// True for filesystem access failures (missing or unreadable paths).
    pub fn is_io(&self) -> bool {
        matches!(self, ArtifactError::Io { .. } | ArtifactError::NotADirectory(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ArtifactError::Format(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, ArtifactError::Corrupt { .. })
    }
}

/// Problems with the format/version marker.
#[derive(Debug, Error)]
pub enum FormatError {
    /// No marker file in the artifact directory
    #[error("format version marker `{}` is missing", .0.display())]
    MissingMarker(PathBuf),

    /// The marker exists but cannot be read or does not hold a version number
    #[error("format version marker `{}` is unreadable: {reason}", path.display())]
    UnreadableMarker { path: PathBuf, reason: String },

    /// The marker names a version outside the loader's supported range
    #[error("format version {found} is not supported (supported: {min}..={max})")]
    Unsupported { found: u32, min: u32, max: u32 },
}

/// Why a descriptor record was rejected.
#[derive(Debug, Error)]
pub enum CorruptReason {
    #[error("metadata is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("metadata declares format version {embedded} but the marker says {marker}")]
    VersionDisagreement { marker: u32, embedded: u32 },

    #[error("checksum mismatch: expected {expected:08x}, computed {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("checksum file does not hold a hex CRC32: `{0}`")]
    InvalidChecksum(String),

    #[error("{owner}: {source}")]
    UnknownTypeTag {
        owner: String,
        #[source]
        source: UnknownTypeTag,
    },

    #[error("field `{field}` has negative dimension {value} on axis {axis}")]
    NegativeDimension { field: String, axis: usize, value: i64 },

    #[error("field `{field}` has dimension {value} on axis {axis}, above the encodable maximum")]
    DimensionTooLarge { field: String, axis: usize, value: u64 },

    #[error("field `{0}` is too large: its byte size does not fit in 64 bits")]
    SizeOverflow(String),

    #[error("duplicate kernel name `{0}`")]
    DuplicateKernel(String),

    #[error("duplicate field name `{0}`")]
    DuplicateField(String),

    #[error("{0} with an empty name")]
    EmptyName(&'static str),

    #[error("kernel `{0}` has an empty entry symbol")]
    EmptyEntrySymbol(String),
}

/// Result type for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;
