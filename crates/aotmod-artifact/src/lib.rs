//! aotmod artifact reader
//!
//! Reads the directory an offline compiler emits for an AOT module and turns it
//! into validated [`ModuleMetadata`]:
//! - **format**: on-disk layout (version marker, metadata records, checksum)
//! - **types**: element type tags shared by kernel arguments and fields
//! - **metadata**: kernel/field descriptors and their invariants
//! - **reader**: version gate first, then descriptor parsing
//! - **writer**: reference encoder for the same layout

pub mod error;
pub mod format;
pub mod metadata;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::{ArtifactError, ArtifactResult, CorruptReason, FormatError};
pub use format::{
    supported_versions, CHECKSUM_FILE, CURRENT_FORMAT_VERSION, MAX_FORMAT_VERSION, METADATA_FILE,
    MIN_FORMAT_VERSION, VERSION_FILE,
};
pub use metadata::{FieldDescriptor, KernelDescriptor, ModuleMetadata};
pub use reader::{read_artifact, ArtifactReader};
pub use types::{TypeTag, UnknownTypeTag};
pub use writer::{write_artifact, ArtifactWriter};
