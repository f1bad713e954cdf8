//! aotmod runtime
//!
//! Binds AOT artifacts to live execution backends:
//! - **backend**: capability traits plus the in-process and shared-library backends
//! - **registry**: owns backends and hands out generational `BackendId`s
//! - **binder**: resolves kernel entry points and checks fields, all or nothing
//! - **module**: the bound `AotModule` with by-name kernel and field lookup
//! - **loader**: `LoadConfig` → read → bind, as one atomic operation
//! - **options**: loader options (TOML)

pub mod backend;
pub mod binder;
pub mod error;
pub mod loader;
pub mod module;
pub mod options;
pub mod registry;

pub use aotmod_artifact::{FieldDescriptor, KernelDescriptor, ModuleMetadata, TypeTag};
pub use backend::{
    BackendView, DylibBackend, DylibError, EntryPoint, ExecutionBackend, SymbolTableBackend,
};
pub use binder::{bind, bind_with};
pub use error::{ErrorKind, LoadError, LoadResult};
pub use loader::{load, LoadConfig, LoadState, ModuleLoader};
pub use module::{AotModule, FieldHandle, KernelHandle};
pub use options::{LoaderOptions, OptionsError};
pub use registry::{BackendId, BackendRegistry};
