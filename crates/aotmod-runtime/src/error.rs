//! Load and bind error types.

use aotmod_artifact::{ArtifactError, FieldDescriptor};
use thiserror::Error;

use crate::options::OptionsError;
use crate::registry::BackendId;

/// Errors that can occur while loading or binding an AOT module.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the artifact directory failed
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A kernel's entry point is absent from the backend
    #[error("kernel `{kernel}`: entry symbol `{symbol}` is not defined by the backend")]
    UnresolvedSymbol { kernel: String, symbol: String },

    /// A field conflicts with the backend's declaration of the same name
    #[error("field `{field}`: module declares {expected}, backend has {found}")]
    FieldMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// The module was compiled for a different architecture than the backend runs
    #[error("module targets `{module}` but the backend runs `{backend}`")]
    TargetMismatch { module: String, backend: String },

    /// The backend handle is stale or was never registered
    #[error("backend {0} is not registered")]
    BackendUnavailable(BackendId),

    /// Loader options are inconsistent
    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// Coarse classification of a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Format,
    Corrupt,
    UnresolvedSymbol,
    FieldMismatch,
    TargetMismatch,
    Backend,
    Options,
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Artifact(e) if e.is_format() => ErrorKind::Format,
            LoadError::Artifact(e) if e.is_corrupt() => ErrorKind::Corrupt,
            LoadError::Artifact(_) => ErrorKind::Io,
            LoadError::UnresolvedSymbol { .. } => ErrorKind::UnresolvedSymbol,
            LoadError::FieldMismatch { .. } => ErrorKind::FieldMismatch,
            LoadError::TargetMismatch { .. } => ErrorKind::TargetMismatch,
            LoadError::BackendUnavailable(_) => ErrorKind::Backend,
            LoadError::Options(_) => ErrorKind::Options,
        }
    }

    pub(crate) fn field_mismatch(
        expected: &FieldDescriptor,
        found: Option<&FieldDescriptor>,
    ) -> Self {
        LoadError::FieldMismatch {
            field: expected.name.clone(),
            expected: describe_layout(expected),
            found: found.map_or_else(|| "no declaration".to_string(), describe_layout),
        }
    }
}

/// `f32[16, 4]`, or just `i32` for a scalar field.
fn describe_layout(field: &FieldDescriptor) -> String {
    if field.shape.is_empty() {
        return field.element_type.to_string();
    }
    let dims: Vec<String> = field.shape.iter().map(|d| d.to_string()).collect();
    format!("{}[{}]", field.element_type, dims.join(", "))
}

/// Result type for load and bind operations.
pub type LoadResult<T> = Result<T, LoadError>;
